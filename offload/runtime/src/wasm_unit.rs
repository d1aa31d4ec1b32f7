//! WebAssembly computations using Wasmtime.
//!
//! A [`WasmComputation`] wraps a component that exports the
//! `offload:unit/unit` interface. The component is compiled once; every
//! invocation instantiates it into a fresh store, so no guest memory
//! survives from one call to the next.

use std::fmt;

use offload_wire::{CodecKind, Values, WireError};
use wasmtime::component::{bindgen, Component, Linker};
use wasmtime::{Config, Engine, Store};

use crate::computation::{Computation, Returned};
use crate::error::{CallFailure, Result, RuntimeError};

// Generate bindings from the WIT file
bindgen!({
    path: "wit/world.wit",
    world: "unit-world",
});

use exports::offload::unit::unit::Values as WitValues;

/// Convert decoded values to their WIT form.
///
/// Opaque values cross the boundary as JSON text.
fn values_to_wit(values: Values) -> WitValues {
    match values {
        Values::Opaque(value) => WitValues::Opaque(value.map(|v| v.to_string())),
        Values::Int32(v) => WitValues::Int32(v),
        Values::Float64(v) => WitValues::Float64(v),
    }
}

/// Convert a component's result back to a [`Returned`].
fn wit_to_returned(values: WitValues) -> std::result::Result<Returned, CallFailure> {
    Ok(match values {
        WitValues::Opaque(None) => Returned::Opaque(None),
        WitValues::Opaque(Some(text)) => {
            let value = serde_json::from_str(&text).map_err(|e| {
                CallFailure::Decode(WireError::format(CodecKind::Opaque, e.to_string()))
            })?;
            Returned::Opaque(Some(value))
        }
        WitValues::Int32(v) => Returned::from(Values::Int32(v)),
        WitValues::Float64(v) => Returned::from(Values::Float64(v)),
    })
}

/// A computation implemented by a WebAssembly component.
pub struct WasmComputation {
    name: String,
    accepts: Option<CodecKind>,
    engine: Engine,
    component: Component,
}

impl WasmComputation {
    /// Compile a component from its bytes.
    pub fn new(name: impl Into<String>, component_bytes: &[u8]) -> Result<Self> {
        // Create the Wasmtime engine with component model support
        let mut config = Config::new();
        config.wasm_component_model(true);
        let engine = Engine::new(&config).map_err(|e| RuntimeError::Wasm(e.to_string()))?;

        let component = Component::new(&engine, component_bytes)
            .map_err(|e| RuntimeError::Wasm(format!("invalid component: {}", e)))?;

        Ok(Self {
            name: name.into(),
            accepts: None,
            engine,
            component,
        })
    }

    /// Load and compile a component from a file, named after the file stem.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "component".to_string());
        Self::new(name, &bytes)
    }

    /// Restrict registration to one argument layout.
    pub fn accepting(mut self, kind: CodecKind) -> Self {
        self.accepts = Some(kind);
        self
    }

    fn run(&self, args: WitValues) -> std::result::Result<WitValues, CallFailure> {
        let linker = Linker::<()>::new(&self.engine);
        let mut store = Store::new(&self.engine, ());

        let instance = UnitWorld::instantiate(&mut store, &self.component, &linker)
            .map_err(|e| CallFailure::Wasm(format!("instantiate: {}", e)))?;

        instance
            .offload_unit_unit()
            .call_run(&mut store, &args)
            .map_err(|e| CallFailure::Wasm(format!("run: {}", e)))?
            .map_err(CallFailure::Computation)
    }
}

impl Computation for WasmComputation {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> Option<CodecKind> {
        self.accepts
    }

    fn invoke(&self, args: Values) -> std::result::Result<Returned, CallFailure> {
        let result = self.run(values_to_wit(args))?;
        wit_to_returned(result)
    }
}

impl fmt::Debug for WasmComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmComputation")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::Numeric;
    use serde_json::json;

    #[test]
    fn values_conversion() {
        assert!(matches!(
            values_to_wit(Values::Int32(vec![2, 3])),
            WitValues::Int32(v) if v == vec![2, 3]
        ));
        assert!(matches!(
            values_to_wit(Values::none()),
            WitValues::Opaque(None)
        ));
        assert!(matches!(
            values_to_wit(Values::Opaque(Some(json!(["a", 1])))),
            WitValues::Opaque(Some(s)) if s == r#"["a",1]"#
        ));
    }

    #[test]
    fn returned_conversion() {
        assert_eq!(
            wit_to_returned(WitValues::Float64(vec![0.5])).unwrap(),
            Returned::Float64(Numeric::Sequence(vec![0.5]))
        );
        assert_eq!(
            wit_to_returned(WitValues::Opaque(Some("{\"k\":true}".to_string()))).unwrap(),
            Returned::Opaque(Some(json!({"k": true})))
        );
        assert_eq!(
            wit_to_returned(WitValues::Opaque(None)).unwrap(),
            Returned::Opaque(None)
        );
    }

    #[test]
    fn malformed_opaque_result_is_a_decode_failure() {
        let err = wit_to_returned(WitValues::Opaque(Some("{nope".to_string()))).unwrap_err();
        assert!(matches!(err, CallFailure::Decode(e) if e.kind() == CodecKind::Opaque));
    }

    #[test]
    fn invalid_component_bytes() {
        let err = WasmComputation::new("junk", &[0x00, 0x61, 0x73, 0x6d]).unwrap_err();
        assert!(matches!(err, RuntimeError::Wasm(_)));
    }

    #[test]
    fn from_file_reads_the_file() {
        use std::io::Write;
        // Valid magic, not a component
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00])
            .unwrap();

        let err = WasmComputation::from_file(temp.path()).unwrap_err();
        assert!(matches!(err, RuntimeError::Wasm(_)));
    }

    #[test]
    fn from_file_not_found() {
        let result = WasmComputation::from_file("/nonexistent/path/to/add.wasm");
        assert!(matches!(result, Err(RuntimeError::Io(_))));
    }
}
