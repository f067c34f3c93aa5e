#[macro_export]
macro_rules! error_with_location {
    ($msg:expr) => {
        ::anyhow::anyhow!("{} at {}:{}", $msg, file!(), line!())
    };
    ($fmt:expr, $($arg:tt)*) => {
        ::anyhow::anyhow!("{} at {}:{}", format_args!($fmt, $($arg)*), file!(), line!())
    };
}
