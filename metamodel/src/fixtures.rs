//! Small canonical schemas shared by tests across the workspace.

use crate::error::MetamodelError;
use crate::ids::{ObjectTypeId, RoleId};
use crate::model::{Assimilation, PresenceConstraint, ValueConstraint, ValueRange};
use crate::schema::Schema;

/// Adds `entity has value`, with `entity` playing its role exactly once and
/// `value` identifying it. Returns the entity's role and the value's role.
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn identified_by(
    schema: &mut Schema,
    entity: ObjectTypeId,
    value: ObjectTypeId,
) -> Result<(RoleId, RoleId), MetamodelError> {
    let (e, v) = binary(schema, entity, value, "{0} has {1}", true, true)?;
    schema.add_uniqueness_constraint(&[v], true)?;
    Ok((e, v))
}

/// Adds a binary fact type with one reading. The first role may be made
/// unique and mandatory.
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn binary(
    schema: &mut Schema,
    a: ObjectTypeId,
    b: ObjectTypeId,
    reading: &str,
    unique: bool,
    mandatory: bool,
) -> Result<(RoleId, RoleId), MetamodelError> {
    let ft = schema.add_fact_type(&[a, b])?;
    let roles = schema.fact_type(ft).roles.clone();
    let (ra, rb) = (roles[0], roles[1]);
    schema.add_reading(ft, [ra, rb], reading)?;
    if unique || mandatory {
        let rs = schema.add_role_sequence([ra])?;
        schema.add_presence_constraint(PresenceConstraint {
            min_frequency: mandatory.then_some(1),
            max_frequency: unique.then_some(1),
            is_mandatory: mandatory,
            ..PresenceConstraint::over(rs)
        });
    }
    Ok((ra, rb))
}

/// Adds a unary fact type with one reading.
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn unary(schema: &mut Schema, entity: ObjectTypeId, reading: &str) -> Result<RoleId, MetamodelError> {
    let ft = schema.add_fact_type(&[entity])?;
    let role = schema.fact_type(ft).roles[0];
    schema.add_reading(ft, [role], reading)?;
    Ok(role)
}

/// People working for companies.
///
/// - `Person` identified by `PersonName`, `Company` by `CompanyName`
///   (both refining `String`);
/// - `Person works for Company` (mandatory, unique for the person);
/// - `Person was born on Date` (optional, role named `Birth Date`);
/// - `Person smokes` (unary);
/// - `Person has Age`, with `Age` refining `Integer` restricted to 0..150.
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn company() -> Result<Schema, MetamodelError> {
    let mut schema = Schema::new();
    let string = schema.add_value_type("String");
    schema.value_type_mut(string)?.length = Some(64);
    let person_name = schema.add_value_subtype("PersonName", string)?;
    let company_name = schema.add_value_subtype("CompanyName", string)?;
    let date = schema.add_value_type("Date");
    let integer = schema.add_value_type("Integer");
    let age = schema.add_value_subtype("Age", integer)?;
    schema.restrict_value_type(age, ValueConstraint::ranges(vec![ValueRange::integers(0, 150)]))?;

    let person = schema.add_entity_type("Person");
    let company = schema.add_entity_type("Company");
    identified_by(&mut schema, person, person_name)?;
    identified_by(&mut schema, company, company_name)?;
    binary(&mut schema, person, company, "{0} works for {1}", true, true)?;
    let (_, born) = binary(&mut schema, person, date, "{0} was born on {1}", true, false)?;
    schema.set_role_name(born, "Birth Date");
    unary(&mut schema, person, "{0} smokes")?;
    binary(&mut schema, person, age, "{0} has {1}", true, false)?;
    Ok(schema)
}

/// A subtype hierarchy.
///
/// - `Person` identified by `PersonName`;
/// - `Employee` is an identifying, absorbed subtype of `Person`, and has a
///   unique, mandatory `EmployeeNr`;
/// - `Manager` is an identifying subtype of `Employee` mapped separately,
///   and has an optional `Budget`.
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn employees() -> Result<Schema, MetamodelError> {
    let mut schema = Schema::new();
    let person_name = schema.add_value_type("PersonName");
    let employee_nr = schema.add_value_type("EmployeeNr");
    let budget = schema.add_value_type("Money");

    let person = schema.add_entity_type("Person");
    identified_by(&mut schema, person, person_name)?;
    let employee = schema.add_entity_type("Employee");
    schema.add_supertype(employee, person, true, Some(Assimilation::Absorbed))?;
    let (_, nr) = binary(&mut schema, employee, employee_nr, "{0} has {1}", true, true)?;
    schema.add_uniqueness_constraint(&[nr], false)?;
    let manager = schema.add_entity_type("Manager");
    schema.add_supertype(manager, employee, true, Some(Assimilation::Separate))?;
    binary(&mut schema, manager, budget, "{0} has {1}", true, false)?;
    Ok(schema)
}

/// An objectified fact type.
///
/// - `Student` identified by `StudentNr` (an `AutoCounter`), `Course` by
///   `CourseCode`;
/// - `Student enrols in Course` with a spanning preferred uniqueness,
///   objectified as `Enrolment` (link fact types created);
/// - `Enrolment has Grade` (optional).
///
/// # Errors
///
/// Propagates schema construction failures.
pub fn enrolment() -> Result<Schema, MetamodelError> {
    let mut schema = Schema::new();
    let counter = schema.add_value_type("AutoCounter");
    let student_nr = schema.add_value_subtype("StudentNr", counter)?;
    let course_code = schema.add_value_type("CourseCode");
    let grade = schema.add_value_type("Grade");

    let student = schema.add_entity_type("Student");
    let course = schema.add_entity_type("Course");
    identified_by(&mut schema, student, student_nr)?;
    identified_by(&mut schema, course, course_code)?;

    let enrols = schema.add_fact_type(&[student, course])?;
    let roles = schema.fact_type(enrols).roles.clone();
    schema.add_reading(enrols, [roles[0], roles[1]], "{0} enrols in {1}")?;
    schema.add_uniqueness_constraint(&roles, true)?;
    let enrolment = schema.add_entity_type("Enrolment");
    schema.objectify(enrolment, enrols)?;
    schema.create_link_fact_types(enrolment)?;
    binary(&mut schema, enrolment, grade, "{0} has {1}", true, false)?;
    Ok(schema)
}
