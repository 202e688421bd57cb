//! Console messages for people running the tool. Diagnostics go through `tracing` instead.
//! Success and info lines go to stdout, warnings and errors to stderr so that machine-readable
//! stdout stays clean.
#[macro_export]
macro_rules! success_message {
    ($($arg:tt)*) => {{
        use $crate::Colorize as _;
        println!("{} {}", "[SUCCESS]".green().bold(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! error_message {
    ($($arg:tt)*) => {{
        use $crate::Colorize as _;
        eprintln!("{} {}", "  [ERROR]".red().bold(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! warning_message {
    ($($arg:tt)*) => {{
        use $crate::Colorize as _;
        eprintln!("{} {}", "[WARNING]".yellow().bold(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! info_message {
    ($($arg:tt)*) => {{
        use $crate::Colorize as _;
        println!("{} {}", "   [INFO]".cyan().bold(), format_args!($($arg)*));
    }};
}
