use chirpy_types::models::{Chirp, ChirpId, SortOrder, UserId};
use chirpy_types::{Error, Result};

use crate::Database;

impl Database {
    /// Store a chirp under the next free id. Body validation and filtering
    /// belong to the caller.
    pub fn create_chirp(&self, body: &str, author_id: UserId) -> Result<Chirp> {
        self.with_doc_mut(|doc| {
            let chirp = Chirp {
                id: doc.next_chirp_id(),
                body: body.to_string(),
                author_id,
            };
            doc.chirps.insert(chirp.id, chirp.clone());
            Ok(chirp)
        })
    }

    pub fn list_chirps(&self, order: SortOrder) -> Result<Vec<Chirp>> {
        self.with_doc(|doc| {
            // BTreeMap iteration is already ascending by id.
            let mut chirps: Vec<Chirp> = doc.chirps.values().cloned().collect();
            if order == SortOrder::Descending {
                chirps.reverse();
            }
            Ok(chirps)
        })
    }

    /// Chirps by one author, ascending by id.
    pub fn list_chirps_by_author(&self, author_id: UserId) -> Result<Vec<Chirp>> {
        self.with_doc(|doc| {
            Ok(doc
                .chirps
                .values()
                .filter(|c| c.author_id == author_id)
                .cloned()
                .collect())
        })
    }

    pub fn get_chirp(&self, id: ChirpId) -> Result<Chirp> {
        self.with_doc(|doc| {
            doc.chirps
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::not_found("chirp"))
        })
    }

    /// Remove a chirp. Does not check who is asking.
    pub fn delete_chirp(&self, id: ChirpId) -> Result<()> {
        self.with_doc_mut(|doc| {
            doc.chirps
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| Error::not_found("chirp"))
        })
    }
}
