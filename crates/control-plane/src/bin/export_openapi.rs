//! OpenAPI Schema Export Binary
//!
//! This binary exports the OpenAPI specification as JSON to stdout.
//!
//! Usage:
//!   cargo run -p control-plane --bin export-openapi > openapi.json

use control_plane::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let openapi_json = ApiDoc::openapi()
        .to_pretty_json()
        .expect("Failed to serialize OpenAPI spec to JSON");

    println!("{}", openapi_json);
}
