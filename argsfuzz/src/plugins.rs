//! Built-in plugin generators.
//!
//! Each reads optional parameters from the argument's `params` object and
//! falls back to defaults for anything missing or of the wrong type.

use chrono::NaiveDate;
use rand::{Rng, RngCore};
use serde_json::Value;

use crate::core::registry::GeneratorRegistry;
use crate::document::Params;

pub fn register_builtins(registry: &mut GeneratorRegistry) {
    registry.register("ip_address", ip_address);
    registry.register("port_range", port_range);
    registry.register("uuid", uuid);
    registry.register("date_time", date_time);
}

/// IPv4 address. `private_only` restricts to RFC 1918 ranges, plus loopback
/// when `include_localhost` (default true).
pub fn ip_address(rng: &mut dyn RngCore, params: &Params) -> String {
    let private_only = bool_param(params, "private_only", false);
    let include_localhost = bool_param(params, "include_localhost", true);

    if !private_only {
        return format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..=223),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        );
    }

    let ranges = if include_localhost { 3 } else { 2 };
    match rng.gen_range(0..=ranges) {
        0 => format!(
            "10.{}.{}.{}",
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        1 => format!(
            "172.{}.{}.{}",
            rng.gen_range(16..=31),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        2 => format!(
            "192.168.{}.{}",
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        _ => format!(
            "127.{}.{}.{}",
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
    }
}

/// Port number, or `start-end` with `range_probability` when `allow_range`.
pub fn port_range(rng: &mut dyn RngCore, params: &Params) -> String {
    let min_port = int_param(params, "min_port", 1024);
    let max_port = int_param(params, "max_port", 65535).max(min_port);
    let allow_range = bool_param(params, "allow_range", true);
    let range_probability = float_param(params, "range_probability", 0.3);

    let start = rng.gen_range(min_port..=(max_port - 10).max(min_port));
    let end_max = (start + 100).min(max_port);
    if allow_range && rng.r#gen::<f64>() < range_probability && start < end_max {
        let end = rng.gen_range((start + 1)..=end_max);
        return format!("{start}-{end}");
    }
    start.to_string()
}

/// Version-4 shaped UUID; `format: compact` drops the dashes.
pub fn uuid(rng: &mut dyn RngCore, params: &Params) -> String {
    let uppercase = bool_param(params, "uppercase", false);
    let hex: &[u8] = if uppercase {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let variant: &[u8] = if uppercase { b"89AB" } else { b"89ab" };

    let mut draw = |alphabet: &[u8], len: usize| -> String {
        (0..len)
            .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
            .collect()
    };
    let parts = [
        draw(hex, 8),
        draw(hex, 4),
        format!("4{}", draw(hex, 3)),
        format!("{}{}", draw(variant, 1), draw(hex, 3)),
        draw(hex, 12),
    ];

    match str_param(params, "format", "standard") {
        "compact" => parts.concat(),
        _ => parts.join("-"),
    }
}

/// Calendar timestamp between `year_min` and `year_max` (2020..=2025).
///
/// Formats: `iso` (default), `date`, `time`, `epoch` (UTC seconds). Days are
/// drawn from 1..=28 so every month is valid.
pub fn date_time(rng: &mut dyn RngCore, params: &Params) -> String {
    let year_min = int_param(params, "year_min", 2020);
    let year_max = int_param(params, "year_max", 2025).max(year_min);

    let year = rng.gen_range(year_min..=year_max);
    let month: u32 = rng.gen_range(1..=12);
    let day: u32 = rng.gen_range(1..=28);
    let hour: u32 = rng.gen_range(0..=23);
    let minute: u32 = rng.gen_range(0..=59);
    let second: u32 = rng.gen_range(0..=59);

    match str_param(params, "format", "iso") {
        "iso" => format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"),
        "time" => format!("{hour:02}:{minute:02}:{second:02}"),
        "epoch" => {
            let timestamp = i32::try_from(year)
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
                .and_then(|date| date.and_hms_opt(hour, minute, second))
                .map(|moment| moment.and_utc().timestamp());
            match timestamp {
                Some(seconds) => seconds.to_string(),
                None => rng.gen_range(1_577_836_800_i64..=1_735_689_600).to_string(),
            }
        }
        _ => format!("{year:04}-{month:02}-{day:02}"),
    }
}

fn bool_param(params: &Params, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn int_param(params: &Params, key: &str, default: i64) -> i64 {
    params.get(key).and_then(Value::as_i64).unwrap_or(default)
}

fn float_param(params: &Params, key: &str, default: f64) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn str_param<'a>(params: &'a Params, key: &str, default: &'a str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or(default)
}
