//! Simulation-wide options

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::read::parse_flag;
use crate::tree::{ModelTree, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Worker threads (`parallel.omp_num_threads`).
    pub threads: u32,
    /// Virtual wall at the domain edge.
    pub boundary_wall: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            boundary_wall: false,
        }
    }
}

/// Read the thread count and boundary wall flag.
pub fn extract_options(tree: &ModelTree) -> Result<SimulationOptions> {
    let mut options = SimulationOptions::default();

    if let Some(text) = tree
        .section("parallel")
        .and_then(|parallel| parallel.get("omp_num_threads"))
        .and_then(Node::text)
    {
        options.threads = text
            .trim()
            .parse()
            .map_err(|_| ExtractError::InvalidNumber {
                entity: "parallel".to_string(),
                field: "omp_num_threads".to_string(),
                value: text.to_string(),
            })?;
    }

    options.boundary_wall = tree
        .section("options")
        .and_then(|section| section.get("virtual_wall_at_domain_edge"))
        .and_then(Node::text)
        .is_some_and(parse_flag);

    Ok(options)
}
