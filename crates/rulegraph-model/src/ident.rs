//! Identifier canonicalization.
//!
//! Generators spell the same entity as `Systolic Pressure`, `systolic-pressure`
//! or ` systolic_pressure `; all of them become `systolic_pressure`.
//!
//! Steps, in order:
//! 1. trim, lowercase
//! 2. whitespace/hyphen runs -> a single `_`
//! 3. drop non-ASCII code points, then anything outside `[a-z0-9_]`
//! 4. collapse repeated `_`, strip leading/trailing `_`
//!
//! The output alphabet is `[a-z0-9_]` with no edge or doubled underscores, so
//! the function is idempotent.

/// Canonicalize an entity name. Total; may return an empty string.
pub fn normalize_id(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    let mut spaced = String::with_capacity(lowered.len());
    let mut in_separator_run = false;
    for c in lowered.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator_run {
                spaced.push('_');
            }
            in_separator_run = true;
        } else {
            spaced.push(c);
            in_separator_run = false;
        }
    }

    let mut out = String::with_capacity(spaced.len());
    for c in spaced.chars() {
        if !c.is_ascii() {
            continue;
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            continue;
        }
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// `true` when the name survives canonicalization.
pub fn is_valid_id(raw: &str) -> bool {
    !normalize_id(raw).is_empty()
}
