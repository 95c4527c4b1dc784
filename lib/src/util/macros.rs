/// Evaluates the tokens and logs how long they took at `debug` level.
#[doc(hidden)]
#[macro_export]
macro_rules! time {
    ($label:expr, $($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        $crate::tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "{}", $label);
        value
    });
}

pub use time;
