use kube::ResourceExt;
use tracing::info;

use crate::crd::Declaration;
use crate::error::{Error, Result};
use crate::store::{to_dynamic, ObjectKey, ObjectStore};

/// Hand a declaration to the store.  Any failure is fatal to the case and
/// is never retried.
pub async fn submit<D: Declaration>(store: &dyn ObjectStore, declaration: &D) -> Result<ObjectKey> {
    let key = ObjectKey::for_object(declaration).map_err(|source| Error::Submission {
        key: format!("{} {}", D::kind(&()), declaration.name_any()),
        source: Box::new(source),
    })?;
    let rejected = |source: Error| Error::Submission {
        key: key.to_string(),
        source: Box::new(source),
    };

    let obj = to_dynamic(declaration).map_err(rejected)?;
    store.create(&key, &obj).await.map_err(rejected)?;

    info!(kind = %key.kind, ns = %key.namespace, name = %key.name, "submitted declaration");
    Ok(key)
}
