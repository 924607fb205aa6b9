//! Exception types whose handlers turn a linkage failure into expected behaviour.

use abi_model::ClassType;

const CLASS_LOADING_FAILURES: &[&str] = &[
    "java.lang.NoClassDefFoundError",
    "java.lang.ClassNotFoundException",
];
const METHOD_NOT_FOUND: &str = "java.lang.NoSuchMethodError";
const FIELD_NOT_FOUND: &str = "java.lang.NoSuchFieldError";

pub(crate) fn is_class_loading_failure(class: &ClassType) -> bool {
    CLASS_LOADING_FAILURES.contains(&class.class_name())
}

pub(crate) fn is_method_not_found(class: &ClassType) -> bool {
    class.class_name() == METHOD_NOT_FOUND
}

pub(crate) fn is_field_not_found(class: &ClassType) -> bool {
    class.class_name() == FIELD_NOT_FOUND
}
