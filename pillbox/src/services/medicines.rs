//! Medicines service
//!
//! High-level operations on the user's medicine list.
//! Maps store misses to `AppError` for callers that want a `Result`.

use crate::detection::Identification;
use crate::error::{AppError, Result};
use crate::storage::{hash_from_uri, image_uri_for, PhotoStore};
use crate::store::{CategoryFilter, Medicine, MedicineId, NewMedicine, SharedRepository};

/// Service for managing the medicine list
#[derive(Clone)]
pub struct MedicineService {
    repo: SharedRepository,
    photos: PhotoStore,
}

impl MedicineService {
    pub fn new(repo: SharedRepository, photos: PhotoStore) -> Self {
        Self { repo, photos }
    }

    pub async fn add_medicine(&self, req: NewMedicine) -> Medicine {
        tracing::info!("Adding medicine: {}", req.name);

        let medicine = self.repo.write().await.add_medicine(req);

        tracing::info!("Medicine added: {}", medicine.id);
        medicine
    }

    /// Store the capture (if any) and add the identified product to the list.
    ///
    /// The store stays locked while the photo is written so a concurrent
    /// delete cannot remove a file that is about to be referenced.
    pub async fn add_identified(
        &self,
        identification: &Identification,
        photo: Option<&[u8]>,
    ) -> Result<Medicine> {
        let mut repo = self.repo.write().await;

        let image_uri = match photo {
            Some(bytes) => Some(image_uri_for(&self.photos.write(bytes).await?)),
            None => None,
        };

        if identification.is_fallback() {
            tracing::warn!(
                "Adding unidentified capture as {} ({:?})",
                identification.entry.name,
                identification.outcome
            );
        }

        let medicine = repo.add_medicine(identification.to_new_medicine(image_uri));
        tracing::info!("Medicine added: {}", medicine.id);
        Ok(medicine)
    }

    pub async fn get_medicine(&self, id: MedicineId) -> Result<Medicine> {
        self.repo
            .read()
            .await
            .get_medicine_by_id(id)
            .ok_or(AppError::MedicineNotFound(id))
    }

    pub async fn list_medicines(&self) -> Vec<Medicine> {
        self.repo.read().await.get_all_medicines()
    }

    pub async fn list_by_category(&self, filter: CategoryFilter) -> Vec<Medicine> {
        self.repo.read().await.get_medicines_by_category(filter)
    }

    /// Replace a stored medicine. Alarms keep the name they were created with.
    pub async fn update_medicine(&self, medicine: Medicine) -> Result<Medicine> {
        tracing::debug!("Updating medicine: {}", medicine.id);

        let id = medicine.id;
        if !self.repo.write().await.update_medicine(medicine.clone()) {
            return Err(AppError::MedicineNotFound(id));
        }

        Ok(medicine)
    }

    /// Delete a medicine and its alarms. Returns whether anything was removed.
    ///
    /// The medicine's photo goes too, unless another medicine shows the same one.
    pub async fn delete_medicine(&self, id: MedicineId) -> bool {
        tracing::info!("Deleting medicine: {}", id);

        let mut repo = self.repo.write().await;
        let Some(medicine) = repo.get_medicine_by_id(id) else {
            tracing::debug!("Medicine {} was not in the list", id);
            return false;
        };
        repo.delete_medicine(id);

        let Some(uri) = medicine.image_uri else {
            return true;
        };
        let shared = repo
            .get_all_medicines()
            .iter()
            .any(|m| m.image_uri.as_deref() == Some(uri.as_str()));
        if shared {
            tracing::debug!("Photo {} still in use, keeping it", uri);
            return true;
        }

        match hash_from_uri(&uri) {
            Some(hash) => {
                if let Err(e) = self.photos.delete(hash).await {
                    tracing::warn!("Failed to delete photo {}: {}", uri, e);
                }
            }
            None => tracing::debug!("Image {} is not in the photo store", uri),
        }
        true
    }

    /// Case-insensitive search over name, manufacturer and main ingredient
    pub async fn search_medicines(&self, query: &str) -> Vec<Medicine> {
        let query_lower = query.to_lowercase();

        self.list_medicines()
            .await
            .into_iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&query_lower)
                    || m.manufacturer.to_lowercase().contains(&query_lower)
                    || m.main_ingredient.to_lowercase().contains(&query_lower)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{identify, Detection};
    use crate::store::{self, MedicineCategory, MedicineRepository};
    use tempfile::TempDir;

    async fn create_test_service() -> (MedicineService, TempDir) {
        let temp = TempDir::new().unwrap();
        let photos = PhotoStore::new(temp.path().join("photos"));
        photos.initialize().await.unwrap();

        let service = MedicineService::new(store::shared(MedicineRepository::new()), photos);
        (service, temp)
    }

    #[tokio::test]
    async fn test_add_and_get_medicine() {
        let (service, _temp) = create_test_service().await;

        let m = service
            .add_medicine(NewMedicine::new("Tylenol 500mg", MedicineCategory::Medicine))
            .await;

        let fetched = service.get_medicine(m.id).await.unwrap();
        assert_eq!(fetched, m);
    }

    #[tokio::test]
    async fn test_get_missing_medicine_is_not_found() {
        let (service, _temp) = create_test_service().await;

        let m = service
            .add_medicine(NewMedicine::new("Tylenol", MedicineCategory::Medicine))
            .await;
        service.delete_medicine(m.id).await;

        assert!(matches!(
            service.get_medicine(m.id).await,
            Err(AppError::MedicineNotFound(id)) if id == m.id
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_medicine_fails() {
        let (service, _temp) = create_test_service().await;

        let m = service
            .add_medicine(NewMedicine::new("Tylenol", MedicineCategory::Medicine))
            .await;
        service.delete_medicine(m.id).await;

        assert!(service.update_medicine(m).await.is_err());
        assert!(service.list_medicines().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_medicines() {
        let (service, _temp) = create_test_service().await;

        let mut tylenol = NewMedicine::new("Tylenol 500mg", MedicineCategory::Medicine);
        tylenol.main_ingredient = "Acetaminophen".to_string();
        service.add_medicine(tylenol).await;

        let mut centrum = NewMedicine::new("Centrum", MedicineCategory::Supplement);
        centrum.manufacturer = "Haleon".to_string();
        service.add_medicine(centrum).await;

        assert_eq!(service.search_medicines("acetamin").await.len(), 1);
        assert_eq!(service.search_medicines("HALEON").await[0].name, "Centrum");
        assert!(service.search_medicines("aspirin").await.is_empty());
    }

    #[tokio::test]
    async fn test_add_identified_with_photo() {
        let (service, _temp) = create_test_service().await;

        let identification = identify(&[Detection::new("centrum", 0.91)]);
        let m = service
            .add_identified(&identification, Some(b"fake jpeg".as_slice()))
            .await
            .unwrap();

        assert_eq!(m.name, "Centrum Multivitamin");
        assert_eq!(m.category, MedicineCategory::Supplement);

        let uri = m.image_uri.unwrap();
        let hash = hash_from_uri(&uri).unwrap();
        assert!(service.photos.exists(hash).await);
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let (service, _temp) = create_test_service().await;

        service
            .add_medicine(NewMedicine::new("A", MedicineCategory::Medicine))
            .await;
        service
            .add_medicine(NewMedicine::new("B", MedicineCategory::Supplement))
            .await;

        assert_eq!(service.list_by_category(CategoryFilter::All).await.len(), 2);
        let supplements = service
            .list_by_category(MedicineCategory::Supplement.into())
            .await;
        assert_eq!(supplements.len(), 1);
        assert_eq!(supplements[0].name, "B");
    }

    #[tokio::test]
    async fn test_delete_medicine_removes_its_photo() {
        let (service, _temp) = create_test_service().await;

        let identification = identify(&[Detection::new("advil", 0.88)]);
        let m = service
            .add_identified(&identification, Some(b"advil photo".as_slice()))
            .await
            .unwrap();
        let uri = m.image_uri.clone().unwrap();
        let hash = hash_from_uri(&uri).unwrap().to_string();
        assert_eq!(service.photos.list_all().await.unwrap(), vec![hash.clone()]);

        assert!(service.delete_medicine(m.id).await);

        assert!(!service.photos.exists(&hash).await);
        assert!(service.photos.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_photo_survives_single_delete() {
        let (service, _temp) = create_test_service().await;

        // same capture added twice lands on one content-addressed file
        let identification = identify(&[Detection::new("centrum", 0.91)]);
        let first = service
            .add_identified(&identification, Some(b"same bytes".as_slice()))
            .await
            .unwrap();
        let second = service
            .add_identified(&identification, Some(b"same bytes".as_slice()))
            .await
            .unwrap();
        assert_eq!(first.image_uri, second.image_uri);

        let uri = first.image_uri.clone().unwrap();
        assert!(service.delete_medicine(first.id).await);
        assert_eq!(service.photos.read_uri(&uri).await.unwrap(), b"same bytes");

        assert!(service.delete_medicine(second.id).await);
        assert!(service.photos.read_uri(&uri).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_medicine_with_foreign_image_uri() {
        let (service, _temp) = create_test_service().await;

        let mut req = NewMedicine::new("Fucidin", MedicineCategory::ExternalUse);
        req.image_uri = Some("content://media/external/images/42".to_string());
        let m = service.add_medicine(req).await;

        assert!(service.delete_medicine(m.id).await);
        assert!(!service.delete_medicine(m.id).await);
    }
}
