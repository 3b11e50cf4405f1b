//! Built-in MASSAR field set.
//!
//! Ministry identifiers the school application attaches to its core record
//! types: student codes, staff registration numbers and class level codes.

use crate::types::ExtensionFieldSpec;

/// Level codes accepted by MASSAR, from pre-school to the second
/// baccalaureate year. The leading empty line allows "no value".
const MASSAR_LEVEL_CODES: &str =
    "\nPS\nMS\nGS\n1AP\n2AP\n3AP\n4AP\n5AP\n6AP\n1AC\n2AC\n3AC\nTC\n1BAC\n2BAC";

/// Student, Employee and School Class fields, in install order.
pub fn massar_fields() -> Vec<ExtensionFieldSpec> {
    vec![
        ExtensionFieldSpec::new("Student", "massar_code", "Code MASSAR", "Data")
            .insert_after("student_name")
            .unique()
            .in_list_view()
            .in_standard_filter()
            .with_description("Code unique MASSAR attribué par le ministère"),
        ExtensionFieldSpec::new(
            "Student",
            "cne",
            "CNE (Code National de l'Étudiant)",
            "Data",
        )
        .insert_after("massar_code")
        .unique()
        .in_standard_filter()
        .with_description("Code National de l'Étudiant pour le baccalauréat"),
        ExtensionFieldSpec::new("Student", "cin_number", "Numéro CIN", "Data")
            .insert_after("cne")
            .with_description("Numéro de la Carte d'Identité Nationale"),
        ExtensionFieldSpec::new(
            "Student",
            "birth_certificate_number",
            "N° Acte de Naissance",
            "Data",
        )
        .insert_after("date_of_birth")
        .with_description("Numéro de l'acte de naissance"),
        ExtensionFieldSpec::new("Student", "birth_place_ar", "مكان الولادة", "Data")
            .insert_after("birth_place")
            .with_description("Lieu de naissance en arabe"),
        ExtensionFieldSpec::new("Employee", "ppr_number", "N° PPR", "Data")
            .insert_after("employee_number")
            .unique()
            .with_description("Numéro PPR (Personnel)"),
        ExtensionFieldSpec::new("Employee", "som_number", "N° SOM", "Data")
            .insert_after("ppr_number")
            .unique()
            .with_description("Numéro SOM (Matricule)"),
        ExtensionFieldSpec::new(
            "School Class",
            "massar_level_code",
            "Code Niveau MASSAR",
            "Select",
        )
        .insert_after("class_name")
        .with_options(MASSAR_LEVEL_CODES)
        .with_description("Code du niveau scolaire selon MASSAR"),
    ]
}
