//! This build script embeds the current UTC time as the initial clock reference and, for the
//! firmware build, copies the `memory.x` file from the crate root into a directory where the
//! linker can always find it at build time.

use std::{env, error::Error, fs::File, io::Write, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    let out = &PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR not set")?);

    // Create rs file with current UTC time
    File::create(out.join("utc.rs"))?.write_fmt(format_args!(
        "const UTC_EPOCH: i64 = {:?};",
        chrono::Utc::now().timestamp()
    ))?;

    if env::var_os("CARGO_FEATURE_FIRMWARE").is_some() {
        // Put memory layout in the output directory and ensure it's on the linker search path.
        File::create(out.join("memory.x"))?.write_all(include_bytes!("memory.x"))?;
        println!("cargo:rustc-link-search={}", out.display());

        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // By default, Cargo will re-run a build script whenever any file in the project changes,
    // which keeps the embedded time reference fresh.

    Ok(())
}
