use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AssociationCollection, EntityDescriptor, SearchResults, SimilarityResults};
use crate::providers::publication::PublicationRecord;

/// Pretty JSON on stdout, one document per command, same shape as the HTTP API.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_search(result: &SearchResults) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_associations(result: &AssociationCollection) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_entities(result: &[EntityDescriptor]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_similarity(result: &SimilarityResults) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_publication(result: &PublicationRecord) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
