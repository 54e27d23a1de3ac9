//! Semantic validation for decoded structs.
//!
//! Decoding only checks structure. Whether a struct carries the fields its
//! schema requires is up to the consumer, which knows the schema.

use rustc_hash::FxHashSet;

use crate::error::ValidationError;
use crate::model::Struct;

/// Checks that every required field is present.
///
/// `required` lists `(field id, field name)` pairs; the first missing one is
/// reported. Presence is by ID only; the field's wire type is not checked.
pub fn check_required(s: &Struct, required: &[(i16, &'static str)]) -> Result<(), ValidationError> {
    if required.is_empty() {
        return Ok(());
    }
    let present: FxHashSet<i16> = s.fields.iter().map(|f| f.id).collect();
    for &(id, name) in required {
        if !present.contains(&id) {
            return Err(ValidationError::RequiredFieldMissing { name, id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StructBuilder;

    const USER_REQUIRED: &[(i16, &str)] = &[(1, "id"), (3, "email")];

    #[test]
    fn test_all_present() {
        let user = StructBuilder::new()
            .i64(1, 99)
            .string(2, "ada")
            .string(3, "ada@example.com")
            .build();
        assert!(check_required(&user, USER_REQUIRED).is_ok());
    }

    #[test]
    fn test_missing_field() {
        let user = StructBuilder::new().i64(1, 99).string(2, "ada").build();
        let err = check_required(&user, USER_REQUIRED).unwrap_err();
        assert_eq!(err, ValidationError::RequiredFieldMissing { name: "email", id: 3 });
        assert_eq!(err.to_string(), "field email is required");
    }

    #[test]
    fn test_nothing_required() {
        assert!(check_required(&Struct::new(), &[]).is_ok());
    }
}
