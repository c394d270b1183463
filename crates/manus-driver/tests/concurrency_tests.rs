//! 并发读写测试
//!
//! 驱动线程持续推送不同大小的骨骼帧，多个消费线程同时读取快照：
//! 每个快照必须来自同一帧（节点数一致、节点数据不撕裂）。

mod common;

use common::*;
use manus_driver::Aggregator;
use manus_link::MockCoreSdk;
use manus_protocol::LandscapeData;
use rand::Rng;
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

#[test]
#[serial]
fn test_snapshots_never_torn() {
    let sdk = MockCoreSdk::new();
    let aggregator = Arc::new(Aggregator::new(sdk.clone(), fast_config()).unwrap());
    sdk.fire_landscape(&pair_landscape());

    let stop = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicU64::new(0));

    let producer = {
        let sdk = sdk.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut publish_time = 0u64;
            while !stop.load(Ordering::Relaxed) {
                publish_time += 1;
                let nodes = rng.gen_range(1..=25);
                // 同一帧的所有节点带相同标记
                sdk.set_skeletons(vec![skeleton(1, nodes, publish_time as f32, publish_time)]);
                sdk.fire_raw_skeleton();
                thread::sleep(Duration::from_micros(200));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let aggregator = aggregator.clone();
            let stop = stop.clone();
            let reads = reads.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    if let Some(snapshot) = aggregator.get_snapshot(1) {
                        assert_eq!(snapshot.node_count, snapshot.nodes.len());
                        let marker = snapshot.nodes[0].position[1];
                        assert!(snapshot.nodes.iter().all(|n| n.position[1] == marker));
                        reads.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(300));
    stop.store(true, Ordering::Relaxed);
    producer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(reads.load(Ordering::Relaxed) > 0);
    assert!(aggregator.metrics().pose_frames > 0);
}

#[test]
#[serial]
fn test_landscape_pushes_during_reads() {
    let sdk = MockCoreSdk::new();
    let aggregator = Arc::new(Aggregator::new(sdk.clone(), fast_config()).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    let pusher = {
        let sdk = sdk.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut pushes = 0u32;
            loop {
                let gloves = (0..rng.gen_range(0..4u32))
                    .map(|id| glove(id + 1, manus_protocol::Side::Left, rng.gen_bool(0.5)))
                    .collect();
                sdk.fire_landscape(&LandscapeData { gloves, ..Default::default() });
                pushes += 1;
                if stop.load(Ordering::Relaxed) {
                    break pushes;
                }
            }
        })
    };

    // 读到的代数单调不减
    let mut last_generation = 0;
    for _ in 0..2000 {
        if let Some(landscape) = aggregator.landscape() {
            assert!(landscape.generation >= last_generation);
            last_generation = landscape.generation;
        }
        aggregator.vibrate(1, &[0.5]);
    }

    stop.store(true, Ordering::Relaxed);
    let pushes = pusher.join().unwrap();
    let final_landscape = aggregator.landscape().unwrap();
    assert_eq!(final_landscape.generation, pushes as u64);
}
