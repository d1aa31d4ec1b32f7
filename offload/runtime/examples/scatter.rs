//! Scatter work across a small pool, one fresh thread per call.
//!
//! Registers one computation per wire layout, fires off more calls than the
//! pool has slots and prints each result along with the batch timing.

use offload_runtime::{computation, CodecKind, Pool, Result, Values};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Offload scatter example ===\n");

    let pool = Pool::new(2)?;
    println!("capacity: {}\n", pool.capacity());

    let add = pool.register(
        computation::int32("add", |args| args[0] + args[1]),
        CodecKind::Int32Vector,
    )?;
    let scale = pool.register(
        computation::float64("scale", |args| {
            args.iter().map(|x| x * 0.5).collect::<Vec<_>>()
        }),
        CodecKind::Float64Vector,
    )?;
    let greet = pool.register(
        computation::opaque("greet", |args: &[Value]| {
            args.first()
                .and_then(Value::as_str)
                .map(|name| format!("Hello, {}!", name))
        }),
        CodecKind::Opaque,
    )?;

    // Five calls against two slots: three of them wait in the backlog.
    let sums = [vec![2, 3], vec![4, 5], vec![6, 7]]
        .into_iter()
        .map(|args| add.call(args))
        .collect::<Result<Vec<_>>>()?;
    let halves = scale.call(vec![1.0, 3.0, 5.0])?;
    let greeting = greet.call_serialize(&["World"])?;

    println!("queued: {:?}\n", pool.status());

    for pending in sums {
        print_values("add", pending.values().await);
    }
    print_values("scale", halves.values().await);
    print_values("greet", greeting.values().await);

    let batch = pool.idle().await?;
    println!("\nbatch elapsed: {:?}", batch.elapsed);

    println!("\n=== Example complete ===");
    Ok(())
}

fn print_values(name: &str, result: std::result::Result<Values, offload_runtime::CallFailure>) {
    match result {
        Ok(values) => println!("  {} -> {:?}", name, values),
        Err(failure) => println!("  {} failed: {}", name, failure),
    }
}
