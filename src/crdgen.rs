//! # CRD Generator
//!
//! Prints every QubeSec CustomResourceDefinition as a multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/qubesec.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use qubesec_controller::crd::all_crds;

fn main() {
    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Change the CRD types under src/crd/ and regenerate instead");

    for crd in all_crds() {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                let name = crd.metadata.name.as_deref().unwrap_or("unknown");
                eprintln!("Failed to serialize CRD {name} to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
