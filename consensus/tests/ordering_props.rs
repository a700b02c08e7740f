//! Property-based tests for submission ordering
//!
//! For any mix of well-formed and malformed envelopes submitted before a
//! halt, every submission is accepted, CheckTx sees each exactly once in
//! submission order, and the committed block holds exactly the
//! well-formed ones in that order.

mod common;

use common::*;
use consensus::MemorySupport;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn run_sequence(valid: &[bool]) -> (Vec<Vec<u8>>, Vec<String>, Vec<String>, Vec<Vec<u8>>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let support = Arc::new(MemorySupport::new(BATCH_TIMEOUT));
        let (mut chain, recorder) =
            recording_chain(support.clone(), true, Faults::default()).unwrap();
        let worker = chain.start().unwrap();

        let mut expected = Vec::new();
        let mut submitted = Vec::new();
        for (i, ok) in valid.iter().enumerate() {
            let id = format!("tx-{}", i);
            let env = if *ok { envelope(&id) } else { headerless(&id) };
            if *ok {
                expected.push(id);
            }
            submitted.push(wire(&env));
            assert!(chain.enqueue(env).await);
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;
        chain.halt();
        worker.await.unwrap().unwrap();

        (recorder.check_tx(), block_ids(&support, 0), expected, submitted)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: CheckTx order and committed order follow submission order
    #[test]
    fn prop_commit_preserves_submission_order(valid in prop::collection::vec(any::<bool>(), 0..24)) {
        let (checked, committed, expected, submitted) = run_sequence(&valid);

        prop_assert_eq!(checked, submitted);
        prop_assert_eq!(committed, expected);
    }
}
