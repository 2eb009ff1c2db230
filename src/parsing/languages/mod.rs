mod c;
mod cpp;
mod csharp;
mod go;
mod java;
mod javascript;
mod python;
mod rust;
mod typescript;

pub use c::CProfile;
pub use cpp::CppProfile;
pub use csharp::CSharpProfile;
pub use go::GoProfile;
pub use java::JavaProfile;
pub use javascript::JavaScriptProfile;
pub use python::PythonProfile;
pub use rust::RustProfile;
pub use typescript::TypeScriptProfile;
