pub mod crem;
pub mod pdbqt;
pub mod vina;
