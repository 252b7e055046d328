pub mod isbn;
pub mod publication;
pub mod pubmed;
