use anyhow::{Context, Result};
use clap::Parser;
use devcycle_common::{Gene, SimulationConfig, Snapshot, VariantName};
use log::{debug, error, info, trace};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

mod cpu_state;
mod simulation;

use simulation::CpuSimulation;

/// Runs a developmental cell-state model inside a minimal reference host.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Built-in model variant, overriding `[model]` in the config.
    #[arg(long)]
    variant: Option<VariantName>,

    /// Number of ticks, overriding `timing.total_steps`.
    #[arg(long)]
    steps: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting developmental cycle engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(variant) = args.variant {
        config.model.variant = variant;
        config.model.model_file = None;
    }
    if let Some(steps) = args.steps {
        config.timing.total_steps = steps;
        config.validate()?;
    }

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = CpuSimulation::new(config)?;
    info!(
        "Model '{}' initialised with {} cells.",
        sim.regulator().variant().name,
        sim.current_cell_count()
    );
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    let params = sim.params().clone();
    let total_steps = params.total_steps;
    let record_interval_steps = params.record_interval_steps;
    info!(
        "Recording snapshot every {} steps ({:.2} hours).",
        record_interval_steps,
        record_interval_steps as f64 * params.dt_hours
    );

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot (tick = 0) ---
    sim.record_snapshot().context("Failed to record initial snapshot")?;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        if let Err(e) = sim.step() {
            error!("Error during simulation step {}: {}", step + 1, e);
            anyhow::bail!("Simulation step failed.");
        }
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step == total_steps - 1;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "Step [{}/{}] ({:.1} h) | Cells: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.clock().hours(),
                sim.current_cell_count(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_step || is_last_step {
                sim.record_snapshot()
                    .with_context(|| format!("Failed to record snapshot at step {}", step + 1))?;
            }
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_stats {
        let format = output.format.as_deref().unwrap_or("json");
        save_snapshots(&output.base_filename, format, sim.get_recorded_snapshots())?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_cells {
        let filename = format!("{}_final_cells.csv", output.base_filename);
        save_cells(&filename, &sim)?;
        info!("Final cells saved to {}", filename);
    } else {
        info!("Skipping saving final cells as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn save_snapshots(base_filename: &str, format: &str, snapshots: &[Snapshot]) -> Result<()> {
    match format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
            bincode::serialize_into(BufWriter::new(file), snapshots)
                .context("Error serializing snapshots to bincode")?;
            info!("All snapshots saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
            rmp_serde::encode::write(&mut BufWriter::new(file), snapshots)
                .context("Error serializing snapshots to MessagePack")?;
            info!("All snapshots saved to {} (MessagePack format)", filename);
        }
        _ => {
            let filename = format!("{}_snapshots.json", base_filename);
            let json_string = serde_json::to_string(snapshots).context("Error serializing snapshots to JSON")?;
            let mut file = File::create(&filename)
                .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("Error writing snapshot JSON to file '{}'", filename))?;
            info!("All snapshots saved to {} ({} KB)", filename, json_string.len() / 1024);
        }
    }
    Ok(())
}

fn save_cells(filename: &str, sim: &CpuSimulation) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename))?;

    let mut header = vec![
        "id".to_string(),
        "cell_type".to_string(),
        "volume".to_string(),
        "growth_rate".to_string(),
        "parent_growth_rate".to_string(),
        "conversion_probability".to_string(),
    ];
    for gene in Gene::ALL {
        header.push(format!("{}_rna", gene.name()));
        header.push(format!("{}_protein", gene.name()));
    }
    header.extend(["red", "green", "blue"].map(String::from));
    writer.write_record(&header)?;

    for (id, cell) in sim.cells() {
        let mut record = vec![
            id.to_string(),
            cell.cell_type.label().to_string(),
            format!("{:.4}", cell.volume),
            format!("{:.4}", cell.growth_rate),
            format!("{:.4}", cell.parent_growth_rate),
            format!("{:.4}", cell.conversion_probability),
        ];
        for gene in Gene::ALL {
            record.push(format!("{:.6}", cell.rna[gene]));
            record.push(format!("{:.6}", cell.protein[gene]));
        }
        record.extend(cell.color.iter().map(|c| format!("{:.4}", c)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcycle_common::Cell;
    use std::collections::BTreeMap;

    #[test]
    fn snapshots_are_written_in_every_format() {
        let dir = std::env::temp_dir().join(format!("devcycle-out-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("run").display().to_string();
        let cells = BTreeMap::from([(0u64, Cell::default())]);
        let snapshots = vec![Snapshot::from_cells(0, 0.0, &cells, false)];

        save_snapshots(&base, "json", &snapshots).unwrap();
        let text = std::fs::read_to_string(format!("{}_snapshots.json", base)).unwrap();
        let parsed: Vec<Snapshot> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshots);

        save_snapshots(&base, "bincode", &snapshots).unwrap();
        save_snapshots(&base, "messagepack", &snapshots).unwrap();
        for ext in ["bin", "msgpack"] {
            let len = std::fs::metadata(format!("{}_snapshots.{}", base, ext)).unwrap().len();
            assert!(len > 0);
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
