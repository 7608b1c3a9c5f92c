//! Property-based tests for FIFO descriptor handoff between concurrent stages

use mir::pipeline::ExecutionContext;
use mir::Descriptor;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Send `groups` through a fresh context and return what the receiving side saw.
fn hand_off(capacity: usize, groups: Vec<String>) -> (Vec<String>, Result<(), mir::MirError>) {
    runtime().block_on(async move {
        let ctx = ExecutionContext::new(capacity);
        let (rx, tx) = ctx.pipe();

        let parser = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                for group in groups {
                    tx.send(Descriptor::new(group, "Site")).await.unwrap();
                }
                ctx.parser_done();
            })
        };
        let generator = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(desc) = rx.recv().await {
                    seen.push(desc.group);
                }
                ctx.generator_done();
                seen
            })
        };

        let outcome = ctx.wait().await;
        parser.await.unwrap();
        (generator.await.unwrap(), outcome)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_generator_sees_parser_order(
        capacity in 0usize..4,
        groups in prop::collection::vec("[a-z]{1,6}", 0..40),
    ) {
        let (seen, outcome) = hand_off(capacity, groups.clone());
        prop_assert_eq!(outcome, Ok(()));
        prop_assert_eq!(seen, groups);
    }
}
