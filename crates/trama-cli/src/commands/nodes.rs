//! Node type listing command.

use std::path::Path;

use anyhow::anyhow;
use clap::Args;
use serde::Serialize;
use trama_core::{NodeFactory, PortType, Processor};

use super::common::{builtin_factory, load_config};

#[derive(Args)]
pub struct NodesArgs {
    /// Show ports and parameters for one type id
    #[arg(value_name = "TYPE")]
    type_id: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct NodeInfo {
    type_id: String,
    name: String,
    category: String,
    format: String,
    ports: Vec<PortInfo>,
    parameters: Vec<ParamInfo>,
}

#[derive(Debug, Serialize)]
struct PortInfo {
    index: u32,
    symbol: String,
    kind: &'static str,
    input: bool,
}

#[derive(Debug, Serialize)]
struct ParamInfo {
    index: usize,
    name: String,
    value: f32,
}

fn describe(
    factory: &NodeFactory,
    type_id: &str,
    sample_rate: f64,
    block_size: usize,
) -> Option<NodeInfo> {
    let descriptor = factory.describe(type_id)?;
    let processor = factory.instantiate(type_id)?;
    let ports = processor
        .ports(sample_rate, block_size)
        .to_port_list()
        .iter()
        .map(|p| PortInfo {
            index: p.index,
            symbol: p.symbol.clone(),
            kind: p.port_type.slug(),
            input: p.is_input,
        })
        .collect();
    Some(NodeInfo {
        type_id: descriptor.type_id,
        name: descriptor.name,
        category: descriptor.category,
        format: descriptor.format,
        ports,
        parameters: parameters(processor.as_ref()),
    })
}

fn parameters(processor: &dyn Processor) -> Vec<ParamInfo> {
    (0..processor.parameter_count())
        .map(|index| ParamInfo {
            index,
            name: processor.parameter_name(index).unwrap_or_default().to_string(),
            value: processor.parameter(index).unwrap_or_default(),
        })
        .collect()
}

pub fn run(args: NodesArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let factory = builtin_factory();
    let sample_rate = f64::from(config.sample_rate);

    let type_ids: Vec<String> = match &args.type_id {
        Some(id) => vec![id.clone()],
        None => factory.available_types().into_iter().map(|d| d.type_id).collect(),
    };
    let infos = type_ids
        .iter()
        .map(|id| {
            describe(&factory, id, sample_rate, config.block_size)
                .ok_or_else(|| anyhow!("Unknown node type: {id}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if args.type_id.is_none() {
        println!("Available Nodes");
        println!("===============");
        println!();
        for info in &infos {
            let count = |port_type: PortType, input: bool| {
                info.ports
                    .iter()
                    .filter(|p| p.kind == port_type.slug() && p.input == input)
                    .count()
            };
            println!(
                "  {:20} {:22} {:10} audio {}/{}  midi {}/{}",
                info.type_id,
                info.name,
                info.category,
                count(PortType::Audio, true),
                count(PortType::Audio, false),
                count(PortType::Midi, true),
                count(PortType::Midi, false),
            );
        }
        println!();
        println!("Use 'trama nodes <type>' for ports and parameters.");
        return Ok(());
    }

    for info in &infos {
        println!("{} ({})", info.name, info.type_id);
        println!("{}", "=".repeat(info.name.len() + info.type_id.len() + 3));
        println!();
        println!("Ports:");
        for port in &info.ports {
            let direction = if port.input { "in" } else { "out" };
            println!("  {:3}  {:14} {:6} {}", port.index, port.symbol, port.kind, direction);
        }
        println!();
        if info.parameters.is_empty() {
            println!("No parameters.");
        } else {
            println!("Parameters:");
            for param in &info.parameters {
                println!("  {:3}  {:14} {}", param.index, param.name, param.value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_volume() {
        let factory = builtin_factory();
        let info = describe(&factory, "volume", 48000.0, 512).unwrap();
        assert_eq!(info.ports.len(), 4);
        assert_eq!(info.ports[0].symbol, "audio_in_1");
        assert_eq!(info.parameters.len(), 1);
        assert_eq!(info.parameters[0].name, "Volume");
    }

    #[test]
    fn unknown_type_is_none() {
        assert!(describe(&builtin_factory(), "phaser", 48000.0, 512).is_none());
    }
}
