use tracing::info;

use super::repo::CategoryRepo;
use crate::db::RepoError;

pub const DEFAULT_CATEGORIES: &[&str] = &["Category 1"];

/// Upserts the default categories by name; safe to run on every boot.
pub async fn seed_categories<R>(repo: &R) -> Result<(), RepoError>
where
    R: CategoryRepo + ?Sized,
{
    for name in DEFAULT_CATEGORIES {
        let category = repo.upsert_category(name).await?;
        info!(category_id = category.id, name = %category.name, "category seeded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn seeding_twice_keeps_one_row_per_name() {
        let store = MemoryStore::new();
        seed_categories(&store).await.unwrap();
        seed_categories(&store).await.unwrap();

        let categories = store.list_categories().await.unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(categories[0].name, "Category 1");
    }
}
