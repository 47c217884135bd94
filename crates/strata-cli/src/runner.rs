//! Job runner: builds the earth, receivers and source, then drives the solver.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use ndarray::Array3;
use num_complex::Complex64;
use serde::Serialize;

use strata_compute::{ComputeBackend, CpuBackend, SerialBackend};
use strata_core::{DipoleSource, EmEarth1D, FieldPoints};
use strata_earth::LayeredEarth;
use strata_geometry::{PolygonalWireAntenna, Transform};

use crate::config::{EarthConfig, JobConfig, LoopConfig, ReceiverConfig, Source};

/// A fully built, validated model ready to run.
pub struct Model {
    pub earth: Arc<LayeredEarth>,
    pub receivers: Arc<FieldPoints>,
    pub transmitter: Transmitter,
}

pub enum Transmitter {
    Dipole(DipoleSource),
    Loop(Arc<PolygonalWireAntenna>),
}

impl Transmitter {
    pub fn frequencies(&self) -> &[f64] {
        match self {
            Transmitter::Dipole(d) => &d.frequencies,
            Transmitter::Loop(a) => &a.frequencies,
        }
    }
}

/// Fields of a finished run, indexed (frequency, receiver, component).
#[derive(Serialize)]
pub struct FieldTable {
    pub method: String,
    pub frequencies: Vec<f64>,
    pub receivers: Vec<[f64; 3]>,
    pub masked: Vec<bool>,
    pub efield: Option<Array3<Complex64>>,
    pub hfield: Option<Array3<Complex64>>,
    pub convergence_failures: usize,
}

/// Build and validate every part of the model without running it.
pub fn build_model(job: &JobConfig) -> Result<Model> {
    let earth = build_earth(&job.earth).context("Invalid [earth] section")?;
    let receivers = build_receivers(&job.receivers).context("Invalid [receivers] section")?;
    let transmitter = match job.source.kind()? {
        Source::Dipole(d) => {
            let dipole = DipoleSource::new(d.dipole_type, d.location, d.polarisation, d.moment, d.frequencies.clone())
                .context("Invalid [source.dipole] section")?
                .with_phase(d.phase_deg.to_radians());
            Transmitter::Dipole(dipole)
        }
        Source::Loop(l) => Transmitter::Loop(Arc::new(build_loop(l).context("Invalid [source.loop] section")?)),
    };
    if transmitter.frequencies().is_empty() {
        anyhow::bail!("The source has no frequencies");
    }

    info!(
        "Model: {} layers, {} receivers, {} frequencies",
        earth.number_of_layers(),
        receivers.number_of_points(),
        transmitter.frequencies().len()
    );
    Ok(Model {
        earth: Arc::new(earth),
        receivers: Arc::new(receivers),
        transmitter,
    })
}

fn build_earth(config: &EarthConfig) -> Result<LayeredEarth> {
    let mut earth = LayeredEarth::from_real(&config.conductivity, config.thickness.clone())?;
    for (i, model) in config.susceptibility.iter().enumerate() {
        earth.set_layer_susceptibility(i, *model)?;
    }
    for (i, model) in config.permittivity.iter().enumerate() {
        earth.set_layer_permittivity(i, *model)?;
    }
    Ok(earth)
}

fn build_receivers(config: &ReceiverConfig) -> Result<FieldPoints> {
    let mut points = match config {
        ReceiverConfig::Points { points, .. } => FieldPoints::new(points.clone()),
        ReceiverConfig::Profile { start, end, count, .. } => FieldPoints::profile(*start, *end, *count),
    };
    if points.number_of_points() == 0 {
        anyhow::bail!("No receivers defined");
    }
    for &i in config.masked() {
        points.set_mask(i, true)?;
    }
    Ok(points)
}

fn build_loop(config: &LoopConfig) -> Result<PolygonalWireAntenna> {
    let antenna = match &config.placement {
        Some(p) => {
            let placement = Transform::uniform_scale(p.scale)
                .then(&Transform::rotation_z(p.heading_deg))
                .then(&Transform::translation(p.offset[0], p.offset[1], p.offset[2]));
            config.antenna.transformed(&placement)
        }
        None => config.antenna.clone(),
    };
    antenna.validate()?;
    Ok(antenna)
}

/// Create a compute backend from the job's preference string.
///
/// - `"serial"`: one thread, in index order.
/// - `"cpu"` (default): Rayon, with a dedicated pool when `threads` is set.
fn create_backend(preference: &str, threads: Option<usize>) -> Result<Arc<dyn ComputeBackend>> {
    let backend: Arc<dyn ComputeBackend> = match preference {
        "serial" => Arc::new(SerialBackend),
        "cpu" => match threads {
            Some(n) => Arc::new(CpuBackend::with_threads(n)?),
            None => Arc::new(CpuBackend::new()),
        },
        other => {
            warn!("Unknown backend '{other}', using CPU");
            Arc::new(CpuBackend::new())
        }
    };
    info!("Backend: {}", backend.device_info().name);
    Ok(backend)
}

/// Run the job's forward model and collect the fields.
pub fn run_model(job: &JobConfig, model: &Model) -> Result<FieldTable> {
    let settings = &job.transform;
    let mut em = EmEarth1D::new();
    em.set_backend(create_backend(&settings.backend, settings.threads)?);
    em.set_hankel_transform_method(settings.method);
    em.set_qwe_config(settings.qwe.clone());
    em.set_lagged(settings.lagged);
    em.set_fields_to_calculate(settings.fields);
    em.attach_layered_earth(model.earth.clone());
    em.attach_field_points(model.receivers.clone());

    let started = std::time::Instant::now();
    match &model.transmitter {
        Transmitter::Dipole(dipole) => {
            em.attach_dipole_source(dipole.clone());
            em.make_calc3().context("Dipole calculation failed")?;
        }
        Transmitter::Loop(antenna) => {
            em.attach_wire_antenna(antenna.clone());
            em.calculate_wire_antenna_fields(job.output.progress)
                .context("Loop calculation failed")?;
        }
    }
    info!("Forward model finished in {:.2?}", started.elapsed());
    if em.convergence_failures() > 0 {
        warn!(
            "{} QWE transforms stopped at the interval cap",
            em.convergence_failures()
        );
    }

    let receivers = &model.receivers;
    Ok(FieldTable {
        method: settings.method.to_string(),
        frequencies: model.transmitter.frequencies().to_vec(),
        receivers: receivers.locations().to_vec(),
        masked: (0..receivers.number_of_points()).map(|i| receivers.mask(i)).collect(),
        efield: settings.fields.wants_e().then(|| receivers.efield_snapshot()),
        hfield: settings.fields.wants_h().then(|| receivers.hfield_snapshot()),
        convergence_failures: em.convergence_failures(),
    })
}

/// Write one field to CSV, one row per frequency and unmasked receiver.
pub fn write_field_csv(table: &FieldTable, field: &Array3<Complex64>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);

    writeln!(out, "# Strata layered-earth forward model")?;
    writeln!(out, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "# Hankel method: {}", table.method)?;
    writeln!(out, "freq_hz,x,y,z,re_x,im_x,re_y,im_y,re_z,im_z")?;

    for (ifreq, freq) in table.frequencies.iter().enumerate() {
        for (irec, loc) in table.receivers.iter().enumerate() {
            if table.masked[irec] {
                continue;
            }
            let v = |k: usize| field[[ifreq, irec, k]];
            writeln!(
                out,
                "{},{},{},{},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e}",
                freq,
                loc[0],
                loc[1],
                loc[2],
                v(0).re,
                v(0).im,
                v(1).re,
                v(1).im,
                v(2).re,
                v(2).im
            )?;
        }
    }
    out.flush()?;

    println!("Fields written to: {}", path.display());
    Ok(())
}

/// Write the whole table to a JSON file.
pub fn write_fields_json(table: &FieldTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(table).context("JSON serialisation error")?;
    std::fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;

    println!("Fields (JSON) written to: {}", path.display());
    Ok(())
}
