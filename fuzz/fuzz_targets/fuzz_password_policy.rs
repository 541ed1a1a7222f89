#![no_main]

use arbitrary::Arbitrary;
use hotel_auth::{config::PasswordPolicyConfig, PasswordPolicy, PasswordRule};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    min_length: u8,
    require_upper: bool,
    require_digit: bool,
    require_special: bool,
    password: String,
}

fuzz_target!(|input: Input| {
    let config = PasswordPolicyConfig {
        min_length: input.min_length as usize,
        require_upper: input.require_upper,
        require_digit: input.require_digit,
        require_special: input.require_special,
    };
    let check = PasswordPolicy::new(config).validate(&input.password);

    assert_eq!(check.ok, check.reasons.is_empty());

    // Each rule reported at most once
    for (i, rule) in check.reasons.iter().enumerate() {
        assert!(!check.reasons[i + 1..].contains(rule));
    }

    let too_short = input.password.chars().count() < input.min_length as usize;
    assert_eq!(
        too_short,
        check.reasons.iter().any(|r| matches!(r, PasswordRule::TooShort { .. }))
    );

    // Messages should not panic
    assert_eq!(check.messages().len(), check.reasons.len());
});
