// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Driver loop timing runs on tokio's paused clock.

use mediagraph::{
    Component, EngineConfig, FatalError, Notification, Pipeline, PipelineDriver, ReadinessState,
    SimulatedBackend, StaticSubgraphFactory, SubgraphTemplate, TransitionMode, SECOND,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

fn positions(notifications: &[Notification]) -> Vec<i64> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Position { position } => Some(*position),
            _ => None,
        })
        .collect()
}

fn build() -> (
    PipelineDriver,
    SimulatedBackend,
    UnboundedReceiver<Notification>,
) {
    let (backend, bus) = SimulatedBackend::new();
    let mut pipeline = Pipeline::new(EngineConfig::default(), backend.clone());
    let notifications = pipeline.subscribe_channel();
    let driver = PipelineDriver::new(pipeline.into_shared(), bus);
    (driver, backend, notifications)
}

#[tokio::test(start_paused = true)]
async fn test_polls_position_while_playing() {
    let (driver, backend, mut rx) = build();
    let pipeline = driver.pipeline();
    let cancel = driver.cancel_token();
    {
        let mut pipeline = pipeline.lock();
        pipeline.enable_position_polling(Some(Duration::from_millis(300)));
        pipeline.play().unwrap();
    }
    backend.set_position(2 * SECOND);
    let task = tokio::spawn(driver.run());

    tokio::time::sleep(Duration::from_millis(950)).await;
    assert_eq!(positions(&drain(&mut rx)), vec![2 * SECOND; 3]);

    // No polling outside Paused/Playing
    pipeline.lock().stop().unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(positions(&drain(&mut rx)).is_empty());

    cancel.cancel();
    assert_eq!(task.await.unwrap(), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn test_async_transition_completes_through_loop() {
    let (driver, backend, mut rx) = build();
    let pipeline = driver.pipeline();
    let cancel = driver.cancel_token();
    backend.set_transition_mode(TransitionMode::Async);
    pipeline.lock().pause().unwrap();
    let task = tokio::spawn(driver.run());

    tokio::task::yield_now().await;
    assert_eq!(pipeline.lock().cached_state(), ReadinessState::Null);

    backend.complete_pending();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pipeline.lock().cached_state(), ReadinessState::Paused);
    assert_eq!(
        drain(&mut rx),
        vec![Notification::StateChanged {
            state: ReadinessState::Paused
        }]
    );

    cancel.cancel();
    assert_eq!(task.await.unwrap(), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn test_removed_connection_point_stops_loop() {
    let (driver, backend, _rx) = build();
    let pipeline = driver.pipeline();
    let producer = Component::producer(
        "camera",
        StaticSubgraphFactory::new(SubgraphTemplate::new("camera", vec![])),
    );
    let node = {
        let mut pipeline = pipeline.lock();
        pipeline.add_components(&[producer.clone()]).unwrap();
        pipeline.ensure_subgraph(&producer).unwrap()
    };
    let task = tokio::spawn(driver.run());

    backend.emit_pad_removed(node, "video_0");
    assert_eq!(
        task.await.unwrap(),
        Err(FatalError::ConnectionPointRemoved {
            node,
            pad: "video_0".into(),
        })
    );
}
