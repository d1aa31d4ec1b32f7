//! Offload guest component.
//!
//! A WASM unit that sums its arguments. Integer and double lists yield a
//! one-element sum; an opaque JSON array of numbers yields their sum as a
//! JSON number.

// Generate bindings from the WIT file
wit_bindgen::generate!({
    world: "unit-world",
    path: "../runtime/wit/world.wit",
});

use exports::offload::unit::unit::{Guest, Values};

struct Add;

impl Guest for Add {
    fn run(args: Values) -> Result<Values, String> {
        match args {
            Values::Int32(v) => v
                .iter()
                .try_fold(0i32, |acc, x| acc.checked_add(*x))
                .map(|sum| Values::Int32(vec![sum]))
                .ok_or_else(|| "int32 overflow".to_string()),
            Values::Float64(v) => Ok(Values::Float64(vec![v.iter().sum()])),
            Values::Opaque(None) => Ok(Values::Opaque(None)),
            Values::Opaque(Some(text)) => sum_json(&text).map(|sum| Values::Opaque(Some(sum))),
        }
    }
}

/// Sum a JSON array of numbers into a JSON number.
fn sum_json(text: &str) -> Result<String, String> {
    let items: Vec<f64> = serde_json::from_str(text)
        .map_err(|e| format!("expected a JSON array of numbers: {}", e))?;

    let sum: f64 = items.iter().sum();
    if !sum.is_finite() {
        return Err(format!("sum is not a finite number: {}", sum));
    }
    serde_json::to_string(&sum).map_err(|e| e.to_string())
}

// Export the unit implementation
export!(Add);
