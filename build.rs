//! Build script for pollinations-relay
//!
//! Migrations and admin templates are embedded at compile time, so changes
//! to them must trigger a rebuild.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=templates");
}
