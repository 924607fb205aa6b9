//! Utilities shared by abi-check tests.
//!
//! [`ClassFileBuilder`] assembles real class files (constant pool, `Code`,
//! `LineNumberTable`, exception tables, `BootstrapMethods`) so tests can model
//! "before" and "after" versions of a library without a Java toolchain. The
//! archive helpers lay those bytes out as class directories, jars and jmods.

mod archive;
mod class_builder;
mod constant_pool;

pub use archive::{write_class_dir, write_jar, write_jmod};
pub use class_builder::{
    ClassFileBuilder, CodeBuilder, Handle, ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_STATIC,
    ACC_SUPER,
};
