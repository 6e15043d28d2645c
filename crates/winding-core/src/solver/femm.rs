//! FEMM backend driven through generated Lua scripts.
//!
//! FEMM has no persistent API across processes, so a session buffers its
//! commands and replays the whole script whenever a side effect is needed:
//! `persist` runs the script up to and including `mi_saveas`, `query` runs it
//! through analysis and writes the requested values to a scratch file.

use super::{
    BlockAssignment, BoundaryCondition, Circuit, CircuitProperties, MaterialDefinition, Point,
    ProblemDefinition, Query, QueryValue, Rectangle, SolverBackend, SolverSession,
};
use crate::domain::{WindingError, WindingResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FemmConfig {
    /// FEMM executable, e.g. `femm.exe`.
    pub executable: PathBuf,
    /// Optional program the executable is run through, e.g. `wine`.
    pub launcher: Option<PathBuf>,
    pub hide_window: bool,
    /// Directory for generated scripts and query output; defaults to the
    /// system temporary directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for FemmConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("femm"),
            launcher: None,
            hide_window: true,
            scratch_dir: None,
        }
    }
}

impl FemmConfig {
    fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FemmBackend {
    config: Arc<FemmConfig>,
}

impl FemmBackend {
    pub fn new(config: FemmConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &FemmConfig {
        &self.config
    }
}

impl SolverBackend for FemmBackend {
    type Session = FemmSession;

    fn name(&self) -> &'static str {
        "femm"
    }

    fn artifact_extension(&self) -> &'static str {
        "fem"
    }

    fn solution_artifact(&self, artifact: &Path) -> Option<PathBuf> {
        Some(artifact.with_extension("ans"))
    }

    fn new_document(&self) -> WindingResult<Self::Session> {
        Ok(FemmSession::new(
            Arc::clone(&self.config),
            "newdocument(0)".to_string(),
        ))
    }

    fn open_document(&self, artifact: &Path) -> WindingResult<Self::Session> {
        if !artifact.is_file() {
            return Err(WindingError::solver(
                "RUN.SOLVER_OPEN",
                format!("FEMM document '{}' does not exist", artifact.display()),
            ));
        }
        Ok(FemmSession::new(
            Arc::clone(&self.config),
            format!("open({})", lua_path(artifact)),
        ))
    }
}

pub struct FemmSession {
    config: Arc<FemmConfig>,
    script: Vec<String>,
    solved: bool,
    closed: bool,
}

impl FemmSession {
    fn new(config: Arc<FemmConfig>, opening: String) -> Self {
        Self {
            config,
            script: vec![opening],
            solved: false,
            closed: false,
        }
    }

    /// Commands recorded so far, one Lua statement per line.
    pub fn script(&self) -> &[String] {
        &self.script
    }

    fn push(&mut self, line: String) {
        self.script.push(line);
    }

    fn push_definition(&mut self, line: String) {
        self.solved = false;
        self.push(line);
    }

    fn run(&self, extra: &[String]) -> WindingResult<()> {
        let scratch = self.config.scratch_dir();
        let script_path = scratch.join(format!("winding_session_{:016x}.lua", rand::random::<u64>()));
        let mut body = self.script.join("\n");
        for line in extra {
            body.push('\n');
            body.push_str(line);
        }
        body.push_str("\nquit()\n");
        fs::write(&script_path, body).map_err(|source| {
            WindingError::io_system(
                "IO.FEMM_SCRIPT",
                format!(
                    "failed to write FEMM script '{}': {}",
                    script_path.display(),
                    source
                ),
            )
        })?;

        let mut command = match &self.config.launcher {
            Some(launcher) => {
                let mut command = Command::new(launcher);
                command.arg(&self.config.executable);
                command
            }
            None => Command::new(&self.config.executable),
        };
        command.arg(format!("-lua-script={}", script_path.display()));
        if self.config.hide_window {
            command.arg("-windowhide");
        }

        debug!(script = %script_path.display(), lines = self.script.len() + extra.len(), "running FEMM");
        let status = command.status();
        if let Err(error) = fs::remove_file(&script_path) {
            warn!(script = %script_path.display(), %error, "failed to delete FEMM script");
        }
        let status = status.map_err(|source| {
            WindingError::io_system(
                "IO.FEMM_EXEC",
                format!(
                    "failed to execute FEMM '{}': {}",
                    self.config.executable.display(),
                    source
                ),
            )
        })?;

        if status.success() {
            return Ok(());
        }
        let status_text = status.code().map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        );
        Err(WindingError::solver(
            "RUN.FEMM_EXIT",
            format!("FEMM script failed with {}", status_text),
        ))
    }
}

impl SolverSession for FemmSession {
    fn define_problem(&mut self, problem: &ProblemDefinition) -> WindingResult<()> {
        self.push_definition(format!(
            "mi_probdef({}, {}, {}, {}, {}, {})",
            problem.frequency,
            lua_string(problem.units.as_str()),
            lua_string(problem.symmetry.as_str()),
            problem.precision,
            problem.depth,
            problem.min_angle
        ));
        Ok(())
    }

    fn add_label(&mut self, at: Point) -> WindingResult<()> {
        self.push_definition(format!("mi_addblocklabel({}, {})", at.r, at.z));
        Ok(())
    }

    fn draw_region(&mut self, region: Rectangle) -> WindingResult<()> {
        self.push_definition(format!(
            "mi_drawrectangle({}, {}, {}, {})",
            region.lower.r, region.lower.z, region.upper.r, region.upper.z
        ));
        Ok(())
    }

    fn apply_boundary(&mut self, boundary: BoundaryCondition) -> WindingResult<()> {
        match boundary {
            BoundaryCondition::Asymptotic => self.push_definition("mi_makeABC()".to_string()),
        }
        Ok(())
    }

    fn add_material(&mut self, material: &MaterialDefinition) -> WindingResult<()> {
        let line = match material {
            MaterialDefinition::Library { name } => {
                format!("mi_getmaterial({})", lua_string(name))
            }
            MaterialDefinition::Custom(properties) => format!(
                "mi_addmaterial({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                lua_string(&properties.name),
                properties.mu_x,
                properties.mu_y,
                properties.coercivity,
                properties.current_density,
                properties.conductivity,
                properties.lamination_thickness,
                properties.hysteresis_lag,
                properties.lamination_fill,
                properties.lamination.code(),
                properties.hysteresis_lag_x,
                properties.hysteresis_lag_y,
                properties.strands,
                properties.strand_diameter
            ),
        };
        self.push_definition(line);
        Ok(())
    }

    fn add_circuit(&mut self, circuit: &Circuit) -> WindingResult<()> {
        self.push_definition(format!(
            "mi_addcircprop({}, {}, {})",
            lua_string(&circuit.name),
            circuit.current,
            u8::from(circuit.series)
        ));
        Ok(())
    }

    fn set_block_property(&mut self, assignment: &BlockAssignment) -> WindingResult<()> {
        let circuit = assignment.circuit.as_deref().unwrap_or("<None>");
        self.push_definition(format!(
            "mi_selectlabel({}, {})",
            assignment.at.r, assignment.at.z
        ));
        self.push_definition(format!(
            "mi_setblockprop({}, {}, {}, {}, {}, {}, {})",
            lua_string(&assignment.material),
            u8::from(assignment.auto_mesh),
            assignment.mesh_size,
            lua_string(circuit),
            assignment.magnetization_direction,
            assignment.group,
            assignment.turns
        ));
        self.push_definition("mi_clearselected()".to_string());
        Ok(())
    }

    fn set_circuit_excitation(&mut self, circuit: &str, current: f64) -> WindingResult<()> {
        self.push_definition(format!(
            "mi_modifycircprop({}, 1, {})",
            lua_string(circuit),
            current
        ));
        Ok(())
    }

    fn persist(&mut self, artifact: &Path) -> WindingResult<()> {
        self.push(format!("mi_saveas({})", lua_path(artifact)));
        self.run(&[])?;
        if !artifact.is_file() {
            return Err(WindingError::solver(
                "RUN.FEMM_PERSIST",
                format!("FEMM did not write '{}'", artifact.display()),
            ));
        }
        Ok(())
    }

    fn solve(&mut self) -> WindingResult<()> {
        self.push("mi_analyze(1)".to_string());
        self.push("mi_loadsolution()".to_string());
        self.solved = true;
        Ok(())
    }

    fn query(&mut self, queries: &[Query]) -> WindingResult<Vec<QueryValue>> {
        if !self.solved {
            return Err(WindingError::solver(
                "RUN.SOLVER_NOT_SOLVED",
                "query issued before the document was solved",
            ));
        }

        let output = self
            .config
            .scratch_dir()
            .join(format!("winding_query_{:016x}.txt", rand::random::<u64>()));
        let extra = query_script(queries, &output);
        let outcome = self
            .run(&extra)
            .and_then(|()| read_query_output(&output, queries));
        if output.exists() {
            if let Err(error) = fs::remove_file(&output) {
                warn!(output = %output.display(), %error, "failed to delete FEMM query output");
            }
        }
        outcome
    }

    fn close(mut self) -> WindingResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl Drop for FemmSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(lines = self.script.len(), "FEMM session dropped without close");
        }
    }
}

fn lua_string(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

/// FEMM accepts forward slashes on every platform.
fn lua_path(path: &Path) -> String {
    lua_string(&path.display().to_string().replace('\\', "/"))
}

fn query_script(queries: &[Query], output: &Path) -> Vec<String> {
    let mut lines = vec![format!("handle = openfile({}, \"w\")", lua_path(output))];
    for query in queries {
        match query {
            Query::BlockIntegral { block, integral } => {
                lines.push(format!("mo_selectblock({}, {})", block.r, block.z));
                lines.push(format!("value = mo_blockintegral({})", integral.femm_code()));
                lines.push("mo_clearblock()".to_string());
                lines.push("write(handle, re(value), \" \", im(value), \"\\n\")".to_string());
            }
            Query::CircuitProperties { circuit } => {
                lines.push(format!(
                    "current, voltage, flux = mo_getcircuitproperties({})",
                    lua_string(circuit)
                ));
                lines.push(
                    "write(handle, re(current), \" \", im(current), \" \", re(voltage), \" \", im(voltage), \" \", re(flux), \" \", im(flux), \"\\n\")"
                        .to_string(),
                );
            }
        }
    }
    lines.push("closefile(handle)".to_string());
    lines
}

fn read_query_output(output: &Path, queries: &[Query]) -> WindingResult<Vec<QueryValue>> {
    let content = fs::read_to_string(output).map_err(|source| {
        WindingError::solver(
            "RUN.FEMM_OUTPUT",
            format!(
                "FEMM query output '{}' is unreadable: {}",
                output.display(),
                source
            ),
        )
    })?;
    parse_query_output(&content, queries)
}

fn parse_query_output(content: &str, queries: &[Query]) -> WindingResult<Vec<QueryValue>> {
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.len() != queries.len() {
        return Err(WindingError::solver(
            "RUN.FEMM_OUTPUT",
            format!(
                "FEMM returned {} value line(s) for {} queries",
                lines.len(),
                queries.len()
            ),
        ));
    }

    queries
        .iter()
        .zip(lines)
        .map(|(query, line)| {
            let numbers = parse_numbers(line)?;
            match (query, numbers.as_slice()) {
                (Query::BlockIntegral { .. }, [re, im]) => {
                    Ok(QueryValue::Complex(Complex64::new(*re, *im)))
                }
                (
                    Query::CircuitProperties { .. },
                    [current_re, current_im, voltage_re, voltage_im, flux_re, flux_im],
                ) => Ok(QueryValue::Circuit(CircuitProperties {
                    current: Complex64::new(*current_re, *current_im),
                    voltage: Complex64::new(*voltage_re, *voltage_im),
                    flux_linkage: Complex64::new(*flux_re, *flux_im),
                })),
                _ => Err(WindingError::solver(
                    "RUN.FEMM_OUTPUT",
                    format!("unexpected FEMM value line '{}' for {:?}", line, query),
                )),
            }
        })
        .collect()
}

fn parse_numbers(line: &str) -> WindingResult<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                WindingError::solver(
                    "RUN.FEMM_OUTPUT",
                    format!("FEMM value '{}' is not a number", token),
                )
            })
        })
        .collect()
}
