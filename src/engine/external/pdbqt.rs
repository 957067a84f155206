//! Decoder for the pose-scoring program's textual output (PDBQT-flavored):
//! repeated `MODEL` .. `ENDMDL` blocks with fixed-column `ATOM` records and
//! a `REMARK VINA RESULT:` line carrying the free energy and RMSD bounds.

use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed ATOM record at line {line}: {reason}")]
    Atom { line: usize, reason: String },

    #[error("malformed REMARK VINA RESULT record at line {line}")]
    VinaResult { line: usize },
}

/// One `ATOM` record, sliced at the standard coordinate-file column
/// offsets. Free-text columns are kept trimmed but otherwise verbatim.
#[derive(Debug, Clone)]
pub struct PoseAtom {
    pub serial: i32,
    pub name: String,
    pub alt_loc: Option<char>,
    pub res_name: String,
    pub chain_id: Option<char>,
    pub res_seq: i32,
    pub i_code: Option<char>,
    pub position: Point3<f64>,
    pub occupancy: String,
    pub temp_factor: String,
    pub partial_charge: String,
    pub atom_type: String,
}

/// Slices a fixed column range; short lines yield "" exactly like
/// out-of-range slicing in the reference decoder.
fn col(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

fn col_char(line: &str, at: usize) -> Option<char> {
    col(line, at, at + 1).chars().next().filter(|c| *c != ' ')
}

impl PoseAtom {
    pub fn parse(line: &str, lineno: usize) -> Result<Self, ParseError> {
        let err = |reason: &str| ParseError::Atom {
            line: lineno,
            reason: reason.to_string(),
        };

        let serial = col(line, 6, 11)
            .trim()
            .parse::<i32>()
            .map_err(|_| err("serial"))?;
        let res_seq = col(line, 22, 26)
            .trim()
            .parse::<i32>()
            .map_err(|_| err("residue sequence"))?;

        let x = col(line, 30, 38).trim().parse::<f64>().map_err(|_| err("x"))?;
        let y = col(line, 38, 46).trim().parse::<f64>().map_err(|_| err("y"))?;
        let z = col(line, 46, 54).trim().parse::<f64>().map_err(|_| err("z"))?;

        Ok(Self {
            serial,
            name: col(line, 12, 16).trim().to_string(),
            alt_loc: col_char(line, 16),
            res_name: col(line, 17, 21).trim().to_string(),
            chain_id: col_char(line, 21),
            res_seq,
            i_code: col_char(line, 26),
            position: Point3::new(x, y, z),
            occupancy: col(line, 54, 60).trim().to_string(),
            temp_factor: col(line, 60, 66).trim().to_string(),
            partial_charge: col(line, 66, 76).trim().to_string(),
            atom_type: col(line, 78, 80).trim().to_string(),
        })
    }
}

/// One `MODEL` .. `ENDMDL` block.
#[derive(Debug, Clone, Default)]
pub struct PoseBlock {
    /// Run index captured from the `MODEL` line (character offset 5 on).
    pub run: Option<i32>,
    pub free_energy: Option<f64>,
    pub rmsd_lb: Option<f64>,
    pub rmsd_ub: Option<f64>,
    pub atoms: Vec<PoseAtom>,
    /// Verbatim block text, `MODEL` through `ENDMDL` inclusive. Carried so
    /// the winning pose can be attached to an individual unchanged.
    pub raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct VinaOutput {
    pub blocks: Vec<PoseBlock>,
}

enum State {
    SeekModel,
    InModel(PoseBlock),
}

impl VinaOutput {
    /// Runs the `SEEK_MODEL -> IN_MODEL -> SEEK_MODEL` state machine over
    /// the text. A block whose `ENDMDL` never arrives is dropped, not
    /// emitted, matching the reference decoder.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut blocks = Vec::new();
        let mut state = State::SeekModel;

        for (lineno, line) in text.lines().enumerate() {
            state = match state {
                State::SeekModel => {
                    if line.starts_with("MODEL") {
                        let mut block = PoseBlock {
                            run: line[5..].trim().parse().ok(),
                            ..Default::default()
                        };
                        block.raw.push_str(line);
                        block.raw.push('\n');
                        State::InModel(block)
                    } else {
                        State::SeekModel
                    }
                }
                State::InModel(mut block) => {
                    block.raw.push_str(line);
                    block.raw.push('\n');

                    if line.starts_with("ENDMDL") {
                        blocks.push(block);
                        State::SeekModel
                    } else {
                        if line.starts_with("REMARK VINA RESULT:") {
                            let numbers: Vec<f64> = line
                                .rsplit(':')
                                .next()
                                .unwrap_or("")
                                .split_whitespace()
                                .map(str::parse)
                                .collect::<Result<_, _>>()
                                .map_err(|_| ParseError::VinaResult { line: lineno })?;
                            if numbers.len() != 3 {
                                return Err(ParseError::VinaResult { line: lineno });
                            }
                            block.free_energy = Some(numbers[0]);
                            block.rmsd_lb = Some(numbers[1]);
                            block.rmsd_ub = Some(numbers[2]);
                        } else if line.starts_with("MODEL") {
                            // The reference re-parses stray MODEL lines
                            // inside a block, overwriting the run index.
                            block.run = line[5..].trim().parse().ok();
                        } else if line.starts_with("ATOM") {
                            block.atoms.push(PoseAtom::parse(line, lineno)?);
                        }
                        State::InModel(block)
                    }
                }
            };
        }

        Ok(Self { blocks })
    }

    /// The block with the minimum free energy; ties resolve to the first
    /// occurrence in document order. Blocks without a result line are
    /// skipped.
    pub fn best_energy(&self) -> Option<&PoseBlock> {
        let mut best: Option<&PoseBlock> = None;
        for block in &self.blocks {
            let Some(energy) = block.free_energy else {
                continue;
            };
            let beaten = match best.and_then(|b| b.free_energy) {
                Some(current) => energy < current,
                None => true,
            };
            if beaten {
                best = Some(block);
            }
        }
        best
    }
}
