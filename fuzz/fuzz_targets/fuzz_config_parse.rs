#![no_main]

use hotel_auth::{AuthConfig, AuthorizationEvaluator, Feature, PasswordPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = serde_json::from_str::<AuthConfig>(text) else {
        return;
    };
    if config.validate().is_err() {
        return;
    }

    // Durations are clamped, so these must not overflow
    let _ = config.lockout_policy.lock_duration();
    let _ = config.lockout_policy.admin_lock_duration();

    let evaluator = AuthorizationEvaluator::new(&config.roles);
    for role_id in config.roles.keys() {
        let visible = evaluator.visible_features(*role_id);
        if evaluator.is_superuser(*role_id) {
            assert_eq!(visible, Feature::ALL.to_vec());
        }
    }

    let _ = PasswordPolicy::new(config.password_policy.clone()).validate("Abcdef1!");

    // Round-trip through JSON keeps the config
    let reserialized = serde_json::to_string(&config).unwrap();
    let config2: AuthConfig = serde_json::from_str(&reserialized).unwrap();
    assert_eq!(config, config2);
});
