//! TOML configuration deserialisation for forward-modelling jobs.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use strata_core::{DipoleType, FieldsWanted, HankelMethod, QweConfig};
use strata_earth::ColeCole;
use strata_geometry::PolygonalWireAntenna;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub earth: EarthConfig,
    pub receivers: ReceiverConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Layer properties, air first.
#[derive(Debug, Deserialize)]
pub struct EarthConfig {
    /// Real conductivity per layer (S/m).
    pub conductivity: Vec<f64>,
    /// Thickness of each interior layer (m).
    #[serde(default)]
    pub thickness: Vec<f64>,
    /// Optional Cole-Cole relative permeability per layer.
    #[serde(default)]
    pub susceptibility: Vec<ColeCole>,
    /// Optional Cole-Cole relative permittivity per layer.
    #[serde(default)]
    pub permittivity: Vec<ColeCole>,
}

/// Receiver locations: an explicit list or an evenly spaced line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReceiverConfig {
    Points {
        points: Vec<[f64; 3]>,
        /// Indices of receivers to skip.
        #[serde(default)]
        masked: Vec<usize>,
    },
    Profile {
        start: [f64; 3],
        end: [f64; 3],
        count: usize,
        #[serde(default)]
        masked: Vec<usize>,
    },
}

impl ReceiverConfig {
    pub fn masked(&self) -> &[usize] {
        match self {
            ReceiverConfig::Points { masked, .. } | ReceiverConfig::Profile { masked, .. } => masked,
        }
    }
}

/// The transmitter: exactly one of `[source.dipole]` or `[source.loop]`.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    pub dipole: Option<DipoleConfig>,
    #[serde(rename = "loop")]
    pub wire_loop: Option<LoopConfig>,
}

/// Which transmitter a job describes.
pub enum Source<'a> {
    Dipole(&'a DipoleConfig),
    Loop(&'a LoopConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> Result<Source<'_>> {
        match (&self.dipole, &self.wire_loop) {
            (Some(d), None) => Ok(Source::Dipole(d)),
            (None, Some(l)) => Ok(Source::Loop(l)),
            (Some(_), Some(_)) => bail!("[source] must hold either a dipole or a loop, not both"),
            (None, None) => bail!("[source] needs a [source.dipole] or a [source.loop] table"),
        }
    }
}

/// A point dipole transmitter.
#[derive(Debug, Deserialize)]
pub struct DipoleConfig {
    #[serde(rename = "type")]
    pub dipole_type: DipoleType,
    /// Position (m), $z$ positive down.
    pub location: [f64; 3],
    pub polarisation: [f64; 3],
    #[serde(default = "default_moment")]
    pub moment: f64,
    /// Phase of the moment (degrees).
    #[serde(default)]
    pub phase_deg: f64,
    pub frequencies: Vec<f64>,
}

fn default_moment() -> f64 {
    1.0
}

/// A polygonal loop transmitter and its survey placement.
#[derive(Debug, Deserialize)]
pub struct LoopConfig {
    #[serde(flatten)]
    pub antenna: PolygonalWireAntenna,
    #[serde(default)]
    pub placement: Option<PlacementConfig>,
}

/// Scale, then rotate about the vertical, then translate.
#[derive(Debug, Deserialize)]
pub struct PlacementConfig {
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Heading in degrees, turning north towards east.
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default)]
    pub offset: [f64; 3],
}

fn default_scale() -> f64 {
    1.0
}

/// Hankel strategy and driver settings.
#[derive(Debug, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub method: HankelMethod,
    /// Use the lagged filter for horizontal loops.
    #[serde(default = "default_true")]
    pub lagged: bool,
    #[serde(default)]
    pub fields: FieldsWanted,
    #[serde(default)]
    pub qwe: QweConfig,
    /// Compute backend: "cpu" or "serial". Default: "cpu".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Worker threads for the CPU backend; all cores when absent.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            method: HankelMethod::default(),
            lagged: true,
            fields: FieldsWanted::default(),
            qwe: QweConfig::default(),
            backend: default_backend(),
            threads: None,
        }
    }
}

fn default_backend() -> String {
    "cpu".into()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to also save all fields as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Log each finished receiver of a loop run.
    #[serde(default)]
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: false,
            progress: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Reading job file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Parsing job file {}", path.display()))
}

/// Parse a job from TOML text.
pub fn parse_config(content: &str) -> Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    config.source.kind()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIPOLE_JOB: &str = r#"
        [earth]
        conductivity = [0.0, 0.01]

        [receivers]
        points = [[100.0, 0.0, -1.0], [200.0, 0.0, -1.0]]

        [source.dipole]
        type = "magnetic"
        location = [0.0, 0.0, -1.0]
        polarisation = [0.0, 0.0, 1.0]
        frequencies = [100.0, 1000.0]
    "#;

    #[test]
    fn test_minimal_dipole_job_uses_defaults() {
        let job = parse_config(DIPOLE_JOB).unwrap();
        assert_eq!(job.transform.method, HankelMethod::Filter801);
        assert!(job.transform.lagged);
        assert_eq!(job.transform.fields, FieldsWanted::Both);
        assert_eq!(job.output.directory, "./output");
        let Source::Dipole(d) = job.source.kind().unwrap() else {
            panic!("expected a dipole source");
        };
        assert_eq!(d.dipole_type, DipoleType::Magnetic);
        assert_eq!(d.moment, 1.0);
    }

    #[test]
    fn test_loop_job_with_profile_and_placement() {
        let job = parse_config(
            r#"
            [earth]
            conductivity = [0.0, 0.05, 0.002]
            thickness = [30.0]

            [receivers]
            start = [0.0, 0.0, -30.0]
            end = [500.0, 0.0, -30.0]
            count = 11
            masked = [0]

            [source.loop]
            points = [[-10.0, -10.0, 0.0], [10.0, -10.0, 0.0], [10.0, 10.0, 0.0], [-10.0, 10.0, 0.0]]
            current = 5.0
            frequencies = [900.0]

            [source.loop.placement]
            heading_deg = 45.0
            offset = [0.0, 0.0, -30.0]

            [transform]
            method = "key51"
            lagged = false
            fields = "h"
            "#,
        )
        .unwrap();
        assert!(matches!(job.receivers, ReceiverConfig::Profile { count: 11, .. }));
        assert_eq!(job.receivers.masked(), &[0]);
        let Source::Loop(l) = job.source.kind().unwrap() else {
            panic!("expected a loop source");
        };
        assert_eq!(l.antenna.current, 5.0);
        assert_eq!(l.antenna.turns, 1);
        assert_eq!(l.placement.as_ref().unwrap().scale, 1.0);
        assert_eq!(job.transform.method, HankelMethod::Key51);
        assert_eq!(job.transform.fields, FieldsWanted::H);
    }

    #[test]
    fn test_source_must_be_unique() {
        let both = format!(
            "{DIPOLE_JOB}\n[source.loop]\npoints = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]\n"
        );
        assert!(parse_config(&both).is_err());
        let neither = DIPOLE_JOB.replace("[source.dipole]", "[source.other]");
        assert!(parse_config(&neither).is_err());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let job = format!("{DIPOLE_JOB}\n[transform]\nmethod = \"simpson\"\n");
        assert!(parse_config(&job).is_err());
    }
}
