#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use hotel_auth::{
    auth::LockoutPolicy, Clock, CredentialStore, LockoutTracker, ManualClock,
    MemoryCredentialStore, NewCredential,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Failure,
    Success,
    Unlock,
    Advance { minutes: u16 },
}

#[derive(Arbitrary, Debug)]
struct Input {
    max_attempts: u8,
    lock_minutes: u16,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let max_attempts = u32::from(input.max_attempts.max(1));
    let lock_duration = chrono::Duration::minutes(i64::from(input.lock_minutes.max(1)));

    let store = Arc::new(MemoryCredentialStore::new());
    store
        .insert(NewCredential {
            username: "alice".into(),
            verifier: "v".into(),
            role_id: 2,
        })
        .unwrap();
    let clock = Arc::new(ManualClock::default());
    let tracker = LockoutTracker::new(
        store.clone(),
        clock.clone(),
        LockoutPolicy {
            max_attempts,
            lock_duration,
        },
    );

    for op in input.ops.iter().take(256) {
        let before = store.lookup("alice").unwrap().unwrap();
        match op {
            Op::Failure => {
                let status = tracker.record_failure("alice").unwrap();
                let after = store.lookup("alice").unwrap().unwrap();
                assert_eq!(after.failed_attempts, before.failed_attempts.saturating_add(1));
                assert_eq!(status.is_locked(), after.failed_attempts >= max_attempts);
            }
            Op::Success => {
                let was_locked = before.is_locked_at(clock.now());
                tracker.record_success("alice").unwrap();
                let after = store.lookup("alice").unwrap().unwrap();
                assert_eq!(after.failed_attempts, 0);
                assert_eq!(after.is_locked_at(clock.now()), was_locked);
            }
            Op::Unlock => {
                tracker.manual_unlock("alice").unwrap();
                let after = store.lookup("alice").unwrap().unwrap();
                assert_eq!(after.failed_attempts, 0);
                assert!(after.locked_until.is_none());
            }
            Op::Advance { minutes } => {
                clock.advance(chrono::Duration::minutes(i64::from(*minutes)));
            }
        }

        let locked = tracker.is_locked("alice").unwrap();
        assert_eq!(locked, tracker.is_locked("alice").unwrap());
    }
});
