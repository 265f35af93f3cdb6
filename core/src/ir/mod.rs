pub mod anon_name;
pub mod inst;
pub mod lower;
pub mod result_loc;
pub mod side_effects;
pub mod stream;
pub mod value;

pub use anon_name::{AnonTypeName, name_anonymous_entity};
pub use inst::{BlockId, ContainerFieldInst, Inst, InstId, InstKind};
pub use lower::{
    GeneratedUnit, Generator, ModuleOutput, UnitKind, generate_module, should_inline,
};
pub use result_loc::{ResultLoc, no_result_loc};
pub use side_effects::has_side_effects;
pub use stream::{BasicBlock, InstStream};
pub use value::ConstValue;
