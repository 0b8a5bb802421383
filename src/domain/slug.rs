//! Slug derivation for blog titles.
//!
//! Base slugs come from the `slug` crate. Collisions are resolved by the
//! caller-supplied uniqueness predicate, retrying with `-1`, `-2`, … suffixes.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Produce a slug that the predicate reports as free.
///
/// `is_unique` returns `Ok(true)` when no other blog owns the candidate.
pub async fn generate_unique_slug<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn derive_slug_lowercases_and_dashes() {
        assert_eq!(derive_slug("Launch Day!").unwrap(), "launch-day");
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[tokio::test]
    async fn collisions_get_counter_suffix_starting_at_one() {
        let taken = Arc::new(Mutex::new(vec![
            "launch-day".to_string(),
            "launch-day-1".to_string(),
        ]));

        let slug = generate_unique_slug("Launch Day", |candidate| {
            let taken = taken.clone();
            let candidate = candidate.to_string();
            async move { Ok::<_, Infallible>(!taken.lock().unwrap().contains(&candidate)) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "launch-day-2");
    }

    #[tokio::test]
    async fn exhaustion_is_reported() {
        let err = generate_unique_slug("Example", |_| async { Ok::<_, Infallible>(false) })
            .await
            .expect_err("should exhaust");
        assert!(matches!(
            err,
            SlugAsyncError::Slug(SlugError::Exhausted { ref base }) if base == "example"
        ));
    }
}
