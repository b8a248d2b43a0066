//! Plain-text and JSON rendering of listing results for stdout.

use facet::Facet;

use crate::cli::OutputFormat;
use crate::listing::VmDetails;

#[derive(Facet)]
struct VmJson {
    name: String,
    cpus: Option<u32>,
    ram_mib: Option<u64>,
    image: Option<String>,
}

/// One name per line, or a JSON array of strings.
pub fn names(names: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => names.iter().map(|n| format!("{n}\n")).collect(),
        OutputFormat::Json => format!(
            "{}\n",
            facet_json::to_string(&names.to_vec()).expect("JSON serialization")
        ),
    }
}

pub fn details(vms: &[VmDetails], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => {
            let mut out = String::new();
            for vm in vms {
                out.push_str(&vm.name);
                out.push('\n');
                if let Some(cpus) = vm.cpus() {
                    out.push_str(&format!("  CPUs: {cpus}\n"));
                }
                if let Some(ram) = vm.ram_mib() {
                    out.push_str(&format!("  RAM: {ram} MiB\n"));
                }
                if let Some(image) = vm.image_hint() {
                    out.push_str(&format!("  Image: {image}\n"));
                }
            }
            out
        }
        OutputFormat::Json => {
            let rows: Vec<VmJson> = vms
                .iter()
                .map(|vm| VmJson {
                    name: vm.name.clone(),
                    cpus: vm.cpus(),
                    ram_mib: vm.ram_mib(),
                    image: vm.image_hint().map(String::from),
                })
                .collect();
            format!(
                "{}\n",
                facet_json::to_string(&rows).expect("JSON serialization")
            )
        }
    }
}

#[derive(Facet)]
struct CheckJson {
    program: String,
    available: bool,
}

pub fn available(program: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => format!("{program} is available\n"),
        OutputFormat::Json => format!(
            "{}\n",
            facet_json::to_string(&CheckJson {
                program: program.to_string(),
                available: true,
            })
            .expect("JSON serialization")
        ),
    }
}
