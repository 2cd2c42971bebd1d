use time::format_description;
use time::OffsetDateTime;

/// Emit `var` as a compile-time env, taking an override from the build
/// environment or formatting the current UTC time with `pattern`.
fn stamp(var: &str, now: OffsetDateTime, pattern: &str) {
    let value = std::env::var(var).unwrap_or_else(|_| {
        format_description::parse(pattern)
            .ok()
            .and_then(|fmt| now.format(&fmt).ok())
            .unwrap_or_else(|| "unknown".to_string())
    });
    println!("cargo:rerun-if-env-changed={var}");
    println!("cargo:rustc-env={var}={value}");
}

fn main() {
    let now = OffsetDateTime::now_utc();
    stamp("SCENEGRAPH_BUILD_DATE", now, "[month repr:short] [day padding:space] [year]");
    stamp("SCENEGRAPH_BUILD_TIME", now, "[hour]:[minute]:[second]");
}
