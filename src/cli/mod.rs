pub mod doctor;
pub mod export;
pub mod ingest;
pub mod notes;
pub mod recall;
pub mod stats;
