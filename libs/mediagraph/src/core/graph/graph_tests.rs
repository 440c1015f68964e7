// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Running-graph tests: pads, links, request pads and compatibility lookup.

use crate::core::component::ComponentId;
use crate::core::config::BufferingConfig;
use crate::core::graph::{Graph, GraphNode, NodeKind, Pad, PadPresence, PadRef};
use crate::core::media::{Caps, MediaStream};

fn video() -> Caps {
    Caps::new_simple("video/x-raw")
}

fn audio() -> Caps {
    Caps::new_simple("audio/x-raw")
}

fn subgraph(name: &str, pads: Vec<Pad>) -> GraphNode {
    GraphNode::new(
        name,
        NodeKind::Subgraph {
            component: ComponentId::generate(),
        },
        pads,
    )
}

fn fan_out() -> GraphNode {
    GraphNode::new(
        "fanout",
        NodeKind::FanOut {
            producer: ComponentId::generate(),
            stream: MediaStream::video(),
        },
        vec![Pad::sink("sink", Caps::any())],
    )
}

#[test]
fn test_add_and_remove_node() {
    let mut graph = Graph::new();
    let id = graph.add_node(subgraph("source", vec![]));

    assert!(graph.contains_node(id));
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.node(id).map(|n| n.name.as_str()), Some("source"));

    let removed = graph.remove_node(id).unwrap();
    assert_eq!(removed.name, "source");
    assert!(!graph.contains_node(id));
    assert!(graph.remove_node(id).is_none());
}

#[test]
fn test_duplicate_pad_rejected() {
    let mut graph = Graph::new();
    let id = graph.add_node(subgraph("source", vec![Pad::src("src", video())]));
    assert!(graph.add_pad(id, Pad::src("src", audio())).is_err());
    assert!(graph.add_pad(id, Pad::src("src_1", audio())).is_ok());
}

#[test]
fn test_link_checks_direction_and_caps() {
    let mut graph = Graph::new();
    let a = graph.add_node(subgraph(
        "a",
        vec![Pad::src("src", video()), Pad::sink("sink", video())],
    ));
    let b = graph.add_node(subgraph(
        "b",
        vec![Pad::sink("video", video()), Pad::sink("audio", audio())],
    ));

    // Wrong direction
    assert!(graph
        .link(&PadRef::new(a, "sink"), &PadRef::new(b, "video"))
        .is_err());
    // Incompatible caps
    assert!(graph
        .link(&PadRef::new(a, "src"), &PadRef::new(b, "audio"))
        .is_err());
    // Missing pad
    assert!(graph
        .link(&PadRef::new(a, "nope"), &PadRef::new(b, "video"))
        .is_err());

    graph
        .link(&PadRef::new(a, "src"), &PadRef::new(b, "video"))
        .unwrap();
    assert_eq!(graph.link_count(), 1);
}

#[test]
fn test_pad_carries_one_link() {
    let mut graph = Graph::new();
    let a = graph.add_node(subgraph("a", vec![Pad::src("src", video())]));
    let b = graph.add_node(subgraph("b", vec![Pad::sink("sink", video())]));
    let c = graph.add_node(subgraph("c", vec![Pad::sink("sink", video())]));

    graph
        .link(&PadRef::new(a, "src"), &PadRef::new(b, "sink"))
        .unwrap();
    assert!(graph
        .link(&PadRef::new(a, "src"), &PadRef::new(c, "sink"))
        .is_err());
}

#[test]
fn test_peer_and_unlink() {
    let mut graph = Graph::new();
    let a = graph.add_node(subgraph("a", vec![Pad::src("src", video())]));
    let b = graph.add_node(subgraph("b", vec![Pad::sink("sink", video())]));
    let src = PadRef::new(a, "src");
    let sink = PadRef::new(b, "sink");

    graph.link(&src, &sink).unwrap();
    assert_eq!(graph.peer(&src), Some(sink.clone()));
    assert_eq!(graph.peer(&sink), Some(src.clone()));
    assert_eq!(graph.outgoing_links(a), vec![(src.clone(), sink.clone())]);
    assert_eq!(graph.incoming_links(b), vec![(src.clone(), sink.clone())]);

    // Reversed arguments do not name an existing link
    assert!(graph.unlink(&sink, &src).is_err());

    let link = graph.unlink(&src, &sink).unwrap();
    assert_eq!(link.src_pad, "src");
    assert!(graph.peer(&src).is_none());
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn test_request_pads_on_fan_out_only() {
    let mut graph = Graph::new();
    let tee = graph.add_node(fan_out());
    let plain = graph.add_node(subgraph("plain", vec![]));

    let first = graph.request_pad(tee).unwrap();
    let second = graph.request_pad(tee).unwrap();
    assert_eq!(first.pad, "src_0");
    assert_eq!(second.pad, "src_1");
    assert_eq!(
        graph.node(tee).unwrap().pad("src_0").unwrap().presence,
        PadPresence::Request
    );
    assert!(graph.request_pad(plain).is_err());

    graph.release_request_pad(&first).unwrap();
    assert!(graph.node(tee).unwrap().pad("src_0").is_none());
    // Static pads cannot be released as request pads
    assert!(graph
        .release_request_pad(&PadRef::new(tee, "sink"))
        .is_err());
}

#[test]
fn test_release_request_pad_drops_its_link() {
    let mut graph = Graph::new();
    let tee = graph.add_node(fan_out());
    let queue = graph.add_node(GraphNode::new(
        "queue",
        NodeKind::BufferingLink {
            consumer: ComponentId::generate(),
            stream: MediaStream::video(),
            limits: BufferingConfig::default(),
        },
        vec![Pad::sink("sink", Caps::any()), Pad::src("src", Caps::any())],
    ));

    let pad = graph.request_pad(tee).unwrap();
    graph.link(&pad, &PadRef::new(queue, "sink")).unwrap();
    assert_eq!(graph.link_count(), 1);

    graph.release_request_pad(&pad).unwrap();
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn test_compatible_pads_include_linked_pads() {
    let mut graph = Graph::new();
    let source = graph.add_node(subgraph(
        "source",
        vec![
            Pad::src("video_0", video()),
            Pad::src("video_1", video()),
            Pad::src("audio_0", audio()),
        ],
    ));
    let sink = graph.add_node(subgraph("sink", vec![Pad::sink("sink", video())]));

    let mut pads = graph.find_compatible_outgoing_pads(source, &MediaStream::video());
    pads.sort();
    assert_eq!(pads, vec!["video_0".to_string(), "video_1".to_string()]);

    // Linked pads still count
    graph
        .link(&PadRef::new(source, "video_0"), &PadRef::new(sink, "sink"))
        .unwrap();
    let mut pads = graph.find_compatible_outgoing_pads(source, &MediaStream::video());
    pads.sort();
    assert_eq!(pads, vec!["video_0".to_string(), "video_1".to_string()]);
    assert_eq!(
        graph.find_compatible_incoming_pads(sink, &MediaStream::video()),
        vec!["sink".to_string()]
    );

    let named = MediaStream::audio().with_pad_name("audio_0");
    assert_eq!(
        graph.find_compatible_outgoing_pads(source, &named),
        vec!["audio_0".to_string()]
    );
}

#[test]
fn test_remove_node_drops_links() {
    let mut graph = Graph::new();
    let a = graph.add_node(subgraph("a", vec![Pad::src("src", video())]));
    let b = graph.add_node(subgraph("b", vec![Pad::sink("sink", video())]));
    graph
        .link(&PadRef::new(a, "src"), &PadRef::new(b, "sink"))
        .unwrap();

    graph.remove_node(b);
    assert_eq!(graph.link_count(), 0);
    assert!(!graph.is_linked(&PadRef::new(a, "src")));
}

#[test]
fn test_to_dot_lists_nodes_and_links() {
    let mut graph = Graph::new();
    let a = graph.add_node(subgraph("camera", vec![Pad::src("src", video())]));
    let b = graph.add_node(subgraph("display", vec![Pad::sink("sink", video())]));
    graph
        .link(&PadRef::new(a, "src"), &PadRef::new(b, "sink"))
        .unwrap();

    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("camera"));
    assert!(dot.contains("display"));
    assert!(dot.contains("src -> sink"));
}

#[test]
fn test_removed_node_id_stays_dead_after_slot_reuse() {
    let mut graph = Graph::new();
    let first = graph.add_node(subgraph("first", vec![Pad::src("src", video())]));
    graph.remove_node(first);
    let second = graph.add_node(subgraph("second", vec![Pad::src("src", video())]));

    assert_ne!(first, second);
    assert_ne!(first.to_string(), second.to_string());
    assert!(!graph.contains_node(first));
    assert!(graph.node(first).is_none());
    assert!(graph.add_pad(first, Pad::src("video_0", video())).is_err());
    assert!(graph.remove_node(first).is_none());
    assert!(graph
        .find_compatible_outgoing_pads(first, &MediaStream::video())
        .is_empty());

    assert_eq!(graph.node(second).map(|n| n.name.as_str()), Some("second"));
    assert_eq!(graph.nodes().map(|(id, _)| id).collect::<Vec<_>>(), vec![second]);
}
