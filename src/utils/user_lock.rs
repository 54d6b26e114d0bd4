use futures::lock::Mutex;
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Per-user async locks serializing the session read-modify-write paths
/// (check-in force-close + open, check-out close). Entries idle out; a lock
/// re-created after eviction still serializes because eviction only happens
/// while nobody holds the entry.
static USER_LOCKS: Lazy<Cache<u64, Arc<Mutex<()>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_idle(Duration::from_secs(600))
        .build()
});

/// Lock handle for one user. Hold the returned `Arc` and `.lock().await` it;
/// the guard's scope is the critical section.
pub async fn lock_for(user_id: u64) -> Arc<Mutex<()>> {
    USER_LOCKS
        .get_with(user_id, async { Arc::new(Mutex::new(())) })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn same_user_gets_the_same_lock() {
        let a = lock_for(901).await;
        let b = lock_for(901).await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[actix_web::test]
    async fn different_users_get_independent_locks() {
        let a = lock_for(902).await;
        let b = lock_for(903).await;
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one user's guard must not block another user's.
        let _guard = a.lock().await;
        let other = b.try_lock();
        assert!(other.is_some());
    }
}
