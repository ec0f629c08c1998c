//! Characteristic catalog and per-animal assignment

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, ADMIN_ROLES, STAFF_ROLES};
use crate::cache::{keys, Cache, Revalidate, ViewTag};
use crate::db::models::Characteristic;
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, CharacteristicForm, ReplaceCharacteristicsForm};
use crate::workflow::CharacteristicDiff;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Category label -> characteristics, names ascending
pub type Catalog = BTreeMap<String, Vec<Characteristic>>;

#[derive(Clone)]
pub struct CharacteristicService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
    cache: Option<Arc<Cache>>,
}

impl CharacteristicService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>, cache: Option<Arc<Cache>>) -> Self {
        Self { store, revalidator, cache }
    }

    pub async fn list_catalog(&self) -> Result<Catalog> {
        let load = || async {
            let mut catalog = Catalog::new();
            for characteristic in self.store.list_characteristics().await? {
                catalog
                    .entry(characteristic.category.clone())
                    .or_default()
                    .push(characteristic);
            }
            for group in catalog.values_mut() {
                group.sort_by(|a, b| a.name.cmp(&b.name));
            }
            Ok(catalog)
        };

        match &self.cache {
            Some(cache) => {
                let key = keys::view(&ViewTag::Characteristics, &"catalog");
                cache.get_or_load(&key, "characteristics", load).await
            }
            None => load().await,
        }
    }

    pub async fn create_characteristic(
        &self,
        session: Option<&SessionContext>,
        form: CharacteristicForm,
    ) -> Result<Characteristic> {
        require_roles(session, ADMIN_ROLES)?;
        validate_form(&form)?;

        let name = form.name.trim().to_string();
        if self.store.find_characteristic_by_name(&name).await?.is_some() {
            return Err(AppError::field("name", "A characteristic with this name already exists"));
        }

        let characteristic = self
            .store
            .insert_characteristic(Characteristic {
                id: Uuid::new_v4(),
                name,
                category: form.category.trim().to_string(),
                created_at: now(),
            })
            .await?;

        info!(characteristic_id = %characteristic.id, name = %characteristic.name, "Characteristic created");
        self.revalidator.revalidate(&[ViewTag::Characteristics]).await;
        Ok(characteristic)
    }

    /// Replace an animal's characteristics with exactly `form.characteristic_ids`
    #[instrument(skip(self, session, form), fields(animal_id = %animal_id))]
    pub async fn replace_animal_characteristics(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        form: ReplaceCharacteristicsForm,
    ) -> Result<CharacteristicDiff> {
        require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;
        require_animal(self.store.as_ref(), animal_id).await?;

        let known: HashSet<Uuid> = self
            .store
            .list_characteristics()
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if form.characteristic_ids.iter().any(|id| !known.contains(id)) {
            return Err(AppError::field("characteristic_ids", "Unknown characteristic"));
        }

        let current: Vec<Uuid> = self
            .store
            .characteristics_for_animal(animal_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let diff = CharacteristicDiff::compute(&current, &form.characteristic_ids);
        if diff.is_empty() {
            return Ok(diff);
        }

        self.store.apply_characteristic_diff(animal_id, &diff).await?;

        info!(added = diff.to_add.len(), removed = diff.to_remove.len(), "Characteristics replaced");
        self.revalidator
            .revalidate(&[ViewTag::Animal(animal_id), ViewTag::PublicPets])
            .await;
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AnimalListingStatus, Role};
    use crate::services::testing::Harness;
    use tokio_test::assert_ok;

    fn form(name: &str, category: &str) -> CharacteristicForm {
        CharacteristicForm { name: name.into(), category: category.into() }
    }

    async fn catalog(h: &Harness, admin: &SessionContext) -> Vec<Characteristic> {
        let mut out = Vec::new();
        for (name, category) in [("Good with kids", "Family"), ("House trained", "Training"), ("Good with cats", "Family")] {
            out.push(h.services.characteristics.create_characteristic(Some(admin), form(name, category)).await.unwrap());
        }
        out
    }

    fn replace(ids: &[Uuid]) -> ReplaceCharacteristicsForm {
        ReplaceCharacteristicsForm { characteristic_ids: ids.to_vec() }
    }

    #[tokio::test]
    async fn test_catalog_is_grouped_and_sorted() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;
        catalog(&h, &admin).await;

        let grouped = h.services.characteristics.list_catalog().await.unwrap();
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["Family", "Training"]);
        let family: Vec<_> = grouped["Family"].iter().map(|c| c.name.as_str()).collect();
        assert_eq!(family, vec!["Good with cats", "Good with kids"]);
    }

    #[tokio::test]
    async fn test_create_is_admin_only_and_unique() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;
        let staff = h.person(Role::Staff).await;

        let err = h
            .services
            .characteristics
            .create_characteristic(Some(&staff), form("Calm", "Temperament"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        assert_ok!(h.services.characteristics.create_characteristic(Some(&admin), form("Calm", "Temperament")).await);
        let err = h
            .services
            .characteristics
            .create_characteristic(Some(&admin), form(" Calm ", "Temperament"))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("name"));
    }

    #[tokio::test]
    async fn test_replace_applies_a_diff() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Published).await;
        let all = catalog(&h, &admin).await;
        let (kids, trained, cats) = (all[0].id, all[1].id, all[2].id);

        let diff = h
            .services
            .characteristics
            .replace_animal_characteristics(Some(&staff), animal.id, replace(&[kids, trained, kids]))
            .await
            .unwrap();
        assert_eq!(diff.to_add.len(), 2);
        assert!(diff.to_remove.is_empty());

        let diff = h
            .services
            .characteristics
            .replace_animal_characteristics(Some(&staff), animal.id, replace(&[trained, cats]))
            .await
            .unwrap();
        assert_eq!(diff.to_add, vec![cats]);
        assert_eq!(diff.to_remove, vec![kids]);

        let mut current: Vec<Uuid> = h
            .store
            .characteristics_for_animal(animal.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        current.sort();
        let mut expected = vec![trained, cats];
        expected.sort();
        assert_eq!(current, expected);

        let diff = h
            .services
            .characteristics
            .replace_animal_characteristics(Some(&staff), animal.id, replace(&[]))
            .await
            .unwrap();
        assert_eq!(diff.to_remove.len(), 2);
        assert!(h.store.characteristics_for_animal(animal.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_changes_nothing() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;
        let all = catalog(&h, &admin).await;

        let err = h
            .services
            .characteristics
            .replace_animal_characteristics(Some(&staff), animal.id, replace(&[all[0].id, Uuid::new_v4()]))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("characteristic_ids"));
        assert!(h.store.characteristics_for_animal(animal.id).await.unwrap().is_empty());
    }
}
