use crate::database::{AssetDatabase, TargetKind};
use crate::log::ImportLog;
use crate::resolve::CanonicalName;
use crate::settings::ImportSettings;

/// Checks whether importing `expected` at `name` is safe given whatever
/// already sits there. Returns false when the item must be skipped.
///
/// An existing asset of a different kind is deleted when the
/// delete-invalid-assets policy allows it and the deletion verifiably
/// succeeds; otherwise the caller skips the item.
pub fn guard_existing<D: AssetDatabase>(
    db: &mut D,
    name: &CanonicalName,
    expected: TargetKind,
    settings: &ImportSettings,
    log: &mut ImportLog,
) -> bool {
    let Some(handle) = db.try_get(&name.full_path) else {
        return true;
    };
    let Some(existing) = db.kind_of(handle) else {
        return true;
    };
    if existing == expected {
        return true;
    }

    if settings.delete_invalid_assets {
        log.info(format!(
            "Existing invalid asset at '{}' ({} where {} expected), deleting",
            name.full_path,
            existing.label(),
            expected.label()
        ));
        if db.delete(handle) && db.try_get(&name.full_path).is_none() {
            log.info(format!("Invalid asset '{}' deleted", name.full_path));
            true
        } else {
            log.error(format!(
                "Failed to delete invalid asset '{}' (a {} blocks this {} import); it may be \
                 referenced by other content. Asset skipped.",
                name.full_path,
                existing.label(),
                expected.label()
            ));
            false
        }
    } else {
        log.warning(format!(
            "Asset '{}' already exists as {} but this import would create a {}. Delete it or \
             enable delete_invalid_assets. Asset skipped.",
            name.full_path,
            existing.label(),
            expected.label()
        ));
        false
    }
}
