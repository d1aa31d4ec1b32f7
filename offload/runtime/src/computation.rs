//! Computations: the work a unit performs.
//!
//! A computation is registered once and then invoked inside a fresh unit for
//! every call. It never sees raw buffers; the bootstrap decodes its
//! arguments and encodes whatever it returns.
//!
//! Closures are adapted with [`opaque`], [`int32`] and [`float64`]. A
//! WebAssembly component is adapted with
//! [`WasmComputation`](crate::wasm_unit::WasmComputation).

use std::fmt;

use offload_wire::{CodecKind, Values};
use serde::Serialize;
use serde_json::Value;

use crate::error::CallFailure;

/// A numeric result before normalization.
///
/// Vector layouts always carry a sequence, so a scalar becomes a
/// one-element sequence on its way out of the unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric<T> {
    Scalar(T),
    Sequence(Vec<T>),
}

impl<T> Numeric<T> {
    /// Normalize to a sequence.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Numeric::Scalar(v) => vec![v],
            Numeric::Sequence(v) => v,
        }
    }
}

macro_rules! numeric_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Numeric<$t> {
                fn from(v: $t) -> Self {
                    Numeric::Scalar(v)
                }
            }

            impl From<Vec<$t>> for Numeric<$t> {
                fn from(v: Vec<$t>) -> Self {
                    Numeric::Sequence(v)
                }
            }

            impl<const N: usize> From<[$t; N]> for Numeric<$t> {
                fn from(v: [$t; N]) -> Self {
                    Numeric::Sequence(v.to_vec())
                }
            }
        )*
    };
}

numeric_from!(i32, f64);

/// What a computation hands back to the bootstrap.
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    /// A raw structured value, or "no value".
    Opaque(Option<Value>),
    Int32(Numeric<i32>),
    Float64(Numeric<f64>),
}

impl From<Values> for Returned {
    fn from(values: Values) -> Self {
        match values {
            Values::Opaque(v) => Returned::Opaque(v),
            Values::Int32(v) => Returned::Int32(Numeric::Sequence(v)),
            Values::Float64(v) => Returned::Float64(Numeric::Sequence(v)),
        }
    }
}

/// A unit of work that can be packed into a bootstrap.
///
/// Implementations must be self-contained: everything the computation needs
/// arrives through `args`, and each invocation happens inside its own unit.
pub trait Computation: Send + Sync + 'static {
    /// Name used in log lines and errors.
    fn name(&self) -> &str;

    /// The argument layout this computation takes, if it is fixed.
    ///
    /// Registration under any other kind is rejected.
    fn accepts(&self) -> Option<CodecKind> {
        None
    }

    /// Run with a decoded argument list.
    fn invoke(&self, args: Values) -> Result<Returned, CallFailure>;
}

type Body = Box<dyn Fn(Values) -> Result<Returned, CallFailure> + Send + Sync>;

/// A computation backed by a closure over decoded values.
pub struct FnComputation {
    name: String,
    kind: CodecKind,
    body: Body,
}

impl FnComputation {
    /// Wrap a closure that takes values of `kind` and may fail.
    pub fn new<F>(name: impl Into<String>, kind: CodecKind, body: F) -> Self
    where
        F: Fn(Values) -> Result<Returned, CallFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for FnComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComputation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Computation for FnComputation {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> Option<CodecKind> {
        Some(self.kind)
    }

    fn invoke(&self, args: Values) -> Result<Returned, CallFailure> {
        if args.kind() != self.kind {
            return Err(CallFailure::Computation(format!(
                "`{}` takes {} arguments, got {}",
                self.name,
                self.kind,
                args.kind()
            )));
        }
        (self.body)(args)
    }
}

fn unexpected(values: &Values) -> CallFailure {
    CallFailure::Computation(format!("unexpected {} arguments", values.kind()))
}

/// Adapt a closure over structured arguments.
///
/// The decoded argument list is spread positionally: a JSON array becomes
/// the argument slice, "no value" or `null` becomes no arguments, and any
/// other value becomes a single argument. Returning `None` yields "no
/// value", which encodes to the empty buffer.
///
/// ```rust
/// use offload_runtime::computation;
///
/// let greet = computation::opaque("greet", |args| {
///     let name = args.first()?.as_str()?;
///     Some(format!("hello, {name}"))
/// });
/// ```
pub fn opaque<F, R>(name: impl Into<String>, f: F) -> FnComputation
where
    F: Fn(&[Value]) -> Option<R> + Send + Sync + 'static,
    R: Serialize,
{
    FnComputation::new(name, CodecKind::Opaque, move |args| {
        let returned = match args {
            Values::Opaque(None) | Values::Opaque(Some(Value::Null)) => f(&[]),
            Values::Opaque(Some(Value::Array(items))) => f(items.as_slice()),
            Values::Opaque(Some(single)) => f(std::slice::from_ref(&single)),
            other => return Err(unexpected(&other)),
        };
        match returned {
            None => Ok(Returned::Opaque(None)),
            Some(value) => Values::opaque(&value)
                .map(Returned::from)
                .map_err(CallFailure::Encode),
        }
    })
}

/// Adapt a closure over 32-bit integers.
///
/// The closure may return a scalar or a sequence; both encode as a vector.
///
/// ```rust
/// use offload_runtime::computation;
///
/// let add = computation::int32("add", |args| args.iter().sum::<i32>());
/// ```
pub fn int32<F, R>(name: impl Into<String>, f: F) -> FnComputation
where
    F: Fn(&[i32]) -> R + Send + Sync + 'static,
    R: Into<Numeric<i32>>,
{
    FnComputation::new(name, CodecKind::Int32Vector, move |args| match args {
        Values::Int32(args) => Ok(Returned::Int32(f(args.as_slice()).into())),
        other => Err(unexpected(&other)),
    })
}

/// Adapt a closure over doubles.
pub fn float64<F, R>(name: impl Into<String>, f: F) -> FnComputation
where
    F: Fn(&[f64]) -> R + Send + Sync + 'static,
    R: Into<Numeric<f64>>,
{
    FnComputation::new(name, CodecKind::Float64Vector, move |args| match args {
        Values::Float64(args) => Ok(Returned::Float64(f(args.as_slice()).into())),
        other => Err(unexpected(&other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_normalizes_to_one_element() {
        assert_eq!(Numeric::<i32>::from(5).into_vec(), vec![5]);
        assert_eq!(Numeric::<i32>::from(vec![5]).into_vec(), vec![5]);
        assert_eq!(Numeric::<f64>::from([1.0, 2.0]).into_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn int32_closure() {
        let add = int32("add", |args| args[0] + args[1]);
        assert_eq!(add.name(), "add");
        assert_eq!(add.accepts(), Some(CodecKind::Int32Vector));
        assert_eq!(
            add.invoke(Values::Int32(vec![2, 3])).unwrap(),
            Returned::Int32(Numeric::Scalar(5))
        );
    }

    #[test]
    fn float64_closure_returning_sequence() {
        let halves = float64("halves", |args| {
            args.iter().map(|v| v / 2.0).collect::<Vec<_>>()
        });
        assert_eq!(
            halves.invoke(Values::Float64(vec![1.0, 3.0])).unwrap(),
            Returned::Float64(Numeric::Sequence(vec![0.5, 1.5]))
        );
    }

    #[test]
    fn opaque_spreads_array_arguments() {
        let count = opaque("count", |args| Some(args.len()));
        assert_eq!(
            count.invoke(Values::from(json!([1, "two", null]))).unwrap(),
            Returned::Opaque(Some(json!(3)))
        );
        assert_eq!(
            count.invoke(Values::none()).unwrap(),
            Returned::Opaque(Some(json!(0)))
        );
        assert_eq!(
            count.invoke(Values::from(json!("solo"))).unwrap(),
            Returned::Opaque(Some(json!(1)))
        );
    }

    #[test]
    fn opaque_none_is_no_value() {
        let nothing = opaque("nothing", |_| None::<()>);
        assert_eq!(
            nothing.invoke(Values::from(json!([]))).unwrap(),
            Returned::Opaque(None)
        );
    }

    #[test]
    fn opaque_unserializable_result_is_an_encode_failure() {
        let bad = opaque("bad", |_| {
            let mut map = std::collections::HashMap::new();
            map.insert(vec![1u8], 1);
            Some(map)
        });
        assert!(matches!(
            bad.invoke(Values::from(json!([]))),
            Err(CallFailure::Encode(_))
        ));
    }

    #[test]
    fn wrong_kind_is_rejected_before_the_body_runs() {
        let add = int32("add", |_| -> i32 { panic!("must not run") });
        assert!(matches!(
            add.invoke(Values::Float64(vec![1.0])),
            Err(CallFailure::Computation(_))
        ));
    }

    #[test]
    fn returned_from_values() {
        assert_eq!(
            Returned::from(Values::Int32(vec![9])),
            Returned::Int32(Numeric::Sequence(vec![9]))
        );
        assert_eq!(Returned::from(Values::none()), Returned::Opaque(None));
    }
}
