// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end pipeline scenarios against the simulated backend.
//!
//! Only public APIs are used; nothing here reaches into engine internals.

use mediagraph::{
    Action, ActionHandle, Caps, Component, EngineConfig, Format, LinkContext, MediaStream,
    Notification, Pad, Pipeline, PipelineListener, ReadinessState, SimulatedBackend,
    StaticSubgraphFactory, StreamKind, SubgraphTemplate, SECOND,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

// =============================================================================
// Test-only components and actions
// =============================================================================

fn video_caps() -> Caps {
    "video/x-raw, width=[16, 4096]".parse().unwrap()
}

fn audio_caps() -> Caps {
    "audio/x-raw, channels=2".parse().unwrap()
}

/// Producer whose pads only appear once the backend discovers them.
fn demuxing_producer(name: &str) -> Component {
    Component::producer(
        name,
        StaticSubgraphFactory::new(SubgraphTemplate::new(name, vec![])),
    )
}

fn video_consumer(name: &str, sinks: &[&str]) -> Component {
    let pads = sinks
        .iter()
        .map(|sink| Pad::sink(*sink, Caps::new_simple("video/x-raw")))
        .collect();
    Component::consumer(
        name,
        MediaStream::video(),
        StaticSubgraphFactory::new(SubgraphTemplate::new(name, pads)),
    )
}

/// Routes every stream of its producers to all consumers of the same kind.
struct Router {
    producers: Vec<Component>,
    consumers: Vec<Component>,
}

impl Action for Router {
    fn is_active(&self) -> bool {
        false
    }

    fn producers(&self) -> &[Component] {
        &self.producers
    }

    fn consumers(&self) -> &[Component] {
        &self.consumers
    }

    fn remove_producers(&mut self, component: &Component) {
        self.producers.retain(|c| c != component);
    }

    fn remove_consumers(&mut self, component: &Component) {
        self.consumers.retain(|c| c != component);
    }

    fn handle_new_stream(
        &mut self,
        ctx: &mut LinkContext<'_>,
        producer: &Component,
        stream: &MediaStream,
    ) -> bool {
        let mut handled = false;
        for consumer in &self.consumers {
            let Some(wanted) = consumer.accepted_stream() else {
                continue;
            };
            if wanted.kind != stream.kind {
                continue;
            }
            let linked = ctx.ensure_fan_out(producer, stream).and_then(|fan_out| {
                let queue = ctx.ensure_buffering_link(consumer, wanted)?;
                match fan_out {
                    Some(fan_out) => ctx.connect(fan_out, queue).map(|_| true),
                    None => Ok(false),
                }
            });
            handled |= linked.unwrap_or(false);
        }
        handled
    }
}

struct CountingListener {
    count: Arc<AtomicUsize>,
}

impl PipelineListener for CountingListener {
    fn on_notification(&mut self, _notification: &Notification) -> mediagraph::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn setup() -> (
    Pipeline,
    SimulatedBackend,
    mediagraph::BusReceiver,
    UnboundedReceiver<Notification>,
) {
    let (backend, bus) = SimulatedBackend::new();
    let mut pipeline = Pipeline::new(EngineConfig::default(), backend.clone());
    let notifications = pipeline.subscribe_channel();
    (pipeline, backend, bus, notifications)
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

// =============================================================================
// Registry properties
// =============================================================================

#[test]
fn test_registry_never_duplicates() {
    let (mut pipeline, _backend, _bus, _rx) = setup();
    let a = demuxing_producer("a");
    let b = demuxing_producer("b");
    let c = video_consumer("c", &["sink"]);

    pipeline.add_components(&[a.clone(), b.clone()]).unwrap();
    pipeline.set_state(ReadinessState::Ready).unwrap();
    pipeline.add_components(&[b.clone(), c.clone(), a.clone()]).unwrap();
    pipeline.remove_components(&[b.clone()]).unwrap();
    pipeline.add_components(&[b.clone(), b.clone()]).unwrap();

    let ids: Vec<_> = pipeline.components().iter().map(|c| c.id()).collect();
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_remove_while_playing_leaves_registry_intact() {
    let (mut pipeline, _backend, _bus, mut rx) = setup();
    let producer = demuxing_producer("file");
    let consumer = video_consumer("screen", &["sink"]);
    pipeline
        .add_components(&[producer.clone(), consumer.clone()])
        .unwrap();
    pipeline.ensure_buffering_link(&consumer, &MediaStream::video()).unwrap();
    pipeline.play().unwrap();
    drain(&mut rx);

    assert!(pipeline.remove_components(&[consumer.clone()]).is_err());
    assert_eq!(pipeline.components(), &[producer, consumer.clone()]);
    assert_eq!(pipeline.buffering_links().len(), 1);
    assert!(pipeline.subgraph(&consumer).unwrap().is_some());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_foreign_action_leaves_both_registries_alone() {
    let (mut first, _b1, _bus1, _rx1) = setup();
    let (mut second, _b2, _bus2, _rx2) = setup();
    let router = ActionHandle::new(Router {
        producers: vec![],
        consumers: vec![],
    });

    first.add_action(&router).unwrap();
    assert!(second.add_action(&router).is_err());
    assert_eq!(first.actions(), &[router.clone()]);
    assert!(second.actions().is_empty());
    assert_eq!(router.pipeline_binding(), Some(first.id()));
}

// =============================================================================
// State and polling
// =============================================================================

#[test]
fn test_same_state_twice_notifies_once() {
    let (mut pipeline, _backend, mut bus, mut rx) = setup();
    pipeline.set_state(ReadinessState::Paused).unwrap();
    pipeline.set_state(ReadinessState::Paused).unwrap();
    assert!(pipeline.dispatch_pending(&mut bus).is_continue());

    let changes: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, Notification::StateChanged { .. }))
        .collect();
    assert_eq!(
        changes,
        vec![Notification::StateChanged {
            state: ReadinessState::Paused
        }]
    );
}

#[test]
fn test_listeners_receive_in_order_and_drop_out() {
    let (mut pipeline, _backend, _bus, _rx) = setup();
    let count = Arc::new(AtomicUsize::new(0));
    let listener = Arc::new(Mutex::new(CountingListener {
        count: count.clone(),
    }));
    let shared: Arc<Mutex<dyn PipelineListener>> = listener.clone();
    pipeline.subscribe(shared);

    pipeline.play().unwrap();
    pipeline.stop().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    drop(listener);
    pipeline.play().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Discovery scenario
// =============================================================================

#[test]
fn test_discovery_then_playback() {
    let (mut pipeline, backend, mut bus, mut rx) = setup();
    let producer = demuxing_producer("movie");
    let consumer = video_consumer("screen", &["sink"]);
    pipeline
        .add_components(&[producer.clone(), consumer.clone()])
        .unwrap();
    pipeline.enable_position_polling(None);

    let video = MediaStream::video();
    assert_eq!(pipeline.ensure_fan_out(&producer, &video).unwrap(), None);

    let source = pipeline.subgraph(&producer).unwrap().unwrap();
    backend.emit_pad_added(source, Pad::src("video_0", video_caps()));
    backend.emit_pad_added(source, Pad::src("audio_0", audio_caps()));
    assert!(pipeline.dispatch_pending(&mut bus).is_continue());

    let fan_out = pipeline.ensure_fan_out(&producer, &video).unwrap().unwrap();
    assert_eq!(
        pipeline.ensure_fan_out(&producer, &video).unwrap(),
        Some(fan_out)
    );
    let nodes = pipeline.graph().node_count();
    pipeline.ensure_fan_out(&producer, &video).unwrap();
    assert_eq!(pipeline.graph().node_count(), nodes);

    let queue = pipeline.ensure_buffering_link(&consumer, &video).unwrap();
    pipeline.connect(fan_out, queue).unwrap();
    drain(&mut rx);

    pipeline.play().unwrap();
    assert!(pipeline.dispatch_pending(&mut bus).is_continue());
    let changes: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, Notification::StateChanged { .. }))
        .collect();
    assert_eq!(
        changes,
        vec![Notification::StateChanged {
            state: ReadinessState::Playing
        }]
    );
    assert!(pipeline.is_polling());

    // Still feeding the queue
    pipeline.stop().unwrap();
    pipeline.release_fan_out(&producer, &video).unwrap();
    assert!(pipeline.graph().contains_node(fan_out));
    assert_eq!(pipeline.fan_out(&producer, &video).unwrap(), Some(fan_out));
}

#[test]
fn test_router_wires_discovered_streams() {
    let (mut pipeline, backend, mut bus, mut rx) = setup();
    let producer = demuxing_producer("movie");
    let consumer = video_consumer("screen", &["sink"]);
    pipeline
        .add_components(&[producer.clone(), consumer.clone()])
        .unwrap();
    pipeline
        .add_action(&ActionHandle::new(Router {
            producers: vec![producer.clone()],
            consumers: vec![consumer.clone()],
        }))
        .unwrap();

    let source = pipeline.ensure_subgraph(&producer).unwrap();
    backend.emit_pad_added(source, Pad::src("video_0", video_caps()));
    backend.emit_pad_added(source, Pad::src("audio_0", audio_caps()));
    assert!(pipeline.dispatch_pending(&mut bus).is_continue());

    let unhandled: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            Notification::UnhandledStream { stream, .. } => Some(stream.kind),
            _ => None,
        })
        .collect();
    assert_eq!(unhandled, vec![StreamKind::Audio]);

    assert_eq!(pipeline.fan_outs().len(), 1);
    assert_eq!(pipeline.buffering_links().len(), 1);
    // source -> fan-out -> queue -> consumer
    assert_eq!(pipeline.graph().link_count(), 3);
    assert_eq!(backend.link_count(), 3);

    pipeline.play().unwrap();
    pipeline.release().unwrap();
    assert_eq!(pipeline.graph().node_count(), 0);
    assert_eq!(backend.link_count(), 0);
    assert!(backend.attached_nodes().is_empty());
}

#[test]
fn test_ambiguous_consumer_creates_nothing() {
    let (mut pipeline, backend, _bus, _rx) = setup();
    let consumer = video_consumer("wall", &["sink_0", "sink_1"]);
    pipeline.add_components(&[consumer.clone()]).unwrap();

    let err = pipeline
        .ensure_buffering_link(&consumer, &MediaStream::video())
        .unwrap_err();
    assert!(err.reason().contains("ambiguous connection point"));
    assert!(pipeline.buffering_links().is_empty());
    assert_eq!(pipeline.graph().node_count(), 0);
    assert!(backend.attached_nodes().is_empty());
}

// =============================================================================
// Seeking
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_seek_rearms_polling_and_reports_target() {
    let (mut pipeline, backend, _bus, mut rx) = setup();
    pipeline.enable_position_polling(None);
    pipeline.play().unwrap();
    let before = pipeline.next_position_poll().unwrap();
    drain(&mut rx);

    tokio::time::advance(std::time::Duration::from_millis(100)).await;
    pipeline.seek(5 * SECOND, Format::Time).unwrap();

    let after = pipeline.next_position_poll().unwrap();
    assert!(after > before);
    assert_eq!(after, tokio::time::Instant::now() + pipeline.config().poll_interval());
    assert_eq!(
        drain(&mut rx),
        vec![Notification::Position {
            position: 5 * SECOND
        }]
    );
    assert_eq!(backend.seeks().len(), 1);
}
