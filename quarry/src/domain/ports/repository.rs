//! Capability traits composing the repository contracts.
//!
//! Each trait covers exactly one persistence capability so a consumer can
//! depend on the narrowest contract it needs: read-only callers take
//! `Load`/`Find`, writers take `Save`, and so on. `Repository` and
//! `RepositoryWithCreate` bundle the common combinations; any type that
//! implements the parts implements the bundle.
//!
//! All operations are asynchronous and fail with [`RepositoryError`].

use async_trait::async_trait;

use super::RepositoryError;

/// Read one value by key.
#[async_trait]
pub trait Load<K, V>: Send + Sync
where
    K: Send + Sync,
{
    /// Return the value stored under `key`, or `None` when absent.
    async fn load(&self, key: &K) -> Result<Option<V>, RepositoryError>;
}

/// Read many values by key.
#[async_trait]
pub trait LoadAll<K, V>: Send + Sync
where
    K: Send + Sync,
{
    /// Return the values stored under `keys`.
    ///
    /// Keys with no stored value are omitted. Result order is unspecified.
    /// An empty key slice returns an empty vector without touching storage.
    async fn load_all(&self, keys: &[K]) -> Result<Vec<V>, RepositoryError>;
}

/// Query values by filter.
#[async_trait]
pub trait Find<V, F>: Send + Sync
where
    F: Send + Sync,
{
    /// Return every value matching `filter`, ordered and paginated as the
    /// filter requests. An empty filter returns everything.
    async fn find(&self, filter: &F) -> Result<Vec<V>, RepositoryError>;
}

/// Count values by filter.
#[async_trait]
pub trait Count<F>: Send + Sync
where
    F: Send + Sync,
{
    /// Number of values `find` would return if the filter carried no
    /// pagination.
    async fn count(&self, filter: &F) -> Result<u64, RepositoryError>;
}

/// Insert or replace one value.
#[async_trait]
pub trait Save<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Atomically insert `value` under `key`, or replace the value already
    /// stored there. The stored value is not returned.
    async fn save(&self, key: &K, value: &V) -> Result<(), RepositoryError>;
}

/// Insert a new value whose key is generated by storage.
#[async_trait]
pub trait Create<K, I>: Send + Sync
where
    I: Send + Sync,
{
    /// Persist `init` and return the generated key. Callers re-load when
    /// they need the full value.
    async fn create(&self, init: &I) -> Result<K, RepositoryError>;
}

/// A stored value type with a name for error reporting.
pub trait Entity {
    /// Entity name used in `NotFound` errors, e.g. `"account"`.
    const NAME: &'static str;
}

/// Get-or-fail over [`Load`], available on every loader.
#[async_trait]
pub trait LoadExt<K, V>: Load<K, V>
where
    K: std::fmt::Display + Send + Sync + 'static,
    V: Entity + Send + 'static,
{
    /// Load `key`, turning absence into [`RepositoryError::NotFound`].
    async fn get(&self, key: &K) -> Result<V, RepositoryError> {
        let loaded = self.load(key).await?;
        loaded.ok_or_else(|| RepositoryError::not_found(V::NAME, key.to_string()))
    }
}

impl<T, K, V> LoadExt<K, V> for T
where
    T: Load<K, V>,
    K: std::fmt::Display + Send + Sync + 'static,
    V: Entity + Send + 'static,
{
}

/// Full read/write contract: load, load-many, find and save.
pub trait Repository<K, V, F>:
    Load<K, V> + LoadAll<K, V> + Find<V, F> + Save<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
    F: Send + Sync,
{
}

impl<T, K, V, F> Repository<K, V, F> for T
where
    T: Load<K, V> + LoadAll<K, V> + Find<V, F> + Save<K, V>,
    K: Send + Sync,
    V: Send + Sync,
    F: Send + Sync,
{
}

/// [`Repository`] plus key-generating creation.
pub trait RepositoryWithCreate<K, V, F, I>: Repository<K, V, F> + Create<K, I>
where
    K: Send + Sync,
    V: Send + Sync,
    F: Send + Sync,
    I: Send + Sync,
{
}

impl<T, K, V, F, I> RepositoryWithCreate<K, V, F, I> for T
where
    T: Repository<K, V, F> + Create<K, I>,
    K: Send + Sync,
    V: Send + Sync,
    F: Send + Sync,
    I: Send + Sync,
{
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Letter(char);

    impl Entity for Letter {
        const NAME: &'static str = "letter";
    }

    struct Letters(BTreeMap<u32, Letter>);

    #[async_trait]
    impl Load<u32, Letter> for Letters {
        async fn load(&self, key: &u32) -> Result<Option<Letter>, RepositoryError> {
            Ok(self.0.get(key).copied())
        }
    }

    fn letters() -> Letters {
        Letters(BTreeMap::from([(1, Letter('a')), (2, Letter('b'))]))
    }

    #[rstest]
    #[tokio::test]
    async fn get_returns_present_values() {
        assert_eq!(letters().get(&2).await, Ok(Letter('b')));
    }

    #[rstest]
    #[tokio::test]
    async fn get_reports_absent_keys_as_not_found() {
        let error = letters().get(&9).await.expect_err("key 9 is absent");
        assert_eq!(error, RepositoryError::not_found("letter", "9"));
    }
}
