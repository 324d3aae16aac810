use crate::spirv::{Op as SpirvOp, StorageClass};
use crate::{BlockKind, Library, Module, Operand, TypeKind, dump_function};

#[test]
fn dump_simple_function() {
    let mut lib = Library::new("dump", Module::default()).unwrap();
    let void = lib.add_type("Void", TypeKind::Void).unwrap();
    let real = lib.add_type("Real", TypeKind::Float).unwrap();
    let real_ptr = lib.ty(real).pointer_type.unwrap();
    let out = lib.add_global(real, StorageClass::Output, "Out", None).unwrap();

    let f = lib.add_function("Store", void, vec![real_ptr]).unwrap();
    let entry = lib.add_block().unwrap();
    let merge = lib.add_block().unwrap();
    lib.function_mut(f).unwrap().blocks = vec![entry, merge];
    {
        let block = lib.block_mut(entry).unwrap();
        block.kind = BlockKind::Selection;
        block.merge = Some(merge);
    }

    let param = lib.function(f).params[0];
    let half = lib.constant(real, vec![0.5f32.to_bits()]).unwrap();
    let local = lib
        .add_op(
            SpirvOp::Variable,
            Some(real_ptr),
            vec![Operand::Literal(StorageClass::Function as u32)],
        )
        .unwrap();
    lib.block_mut(entry).unwrap().locals.push(local);
    let loaded = lib.emit(entry, SpirvOp::Load, Some(real), vec![Operand::Op(param)]).unwrap();
    let sum = lib
        .emit(entry, SpirvOp::FAdd, Some(real), vec![Operand::Op(loaded), Operand::Op(half)])
        .unwrap();
    lib.emit(entry, SpirvOp::Store, None, vec![Operand::Op(out), Operand::Op(sum)]).unwrap();
    lib.emit(entry, SpirvOp::Branch, None, vec![Operand::Block(merge)]).unwrap();
    lib.emit(merge, SpirvOp::Return, None, vec![]).unwrap();

    insta::assert_snapshot!(dump_function(&lib, f), @r"
    function Store(%0: Real*) -> Void
    block0: selection merge=block1
      %1 = Variable Real*
      %2 = Load Real %0
      %3 = FAdd Real %2 Real(0.5)
      Store @Out %3
      Branch block1
    block1:
      Return
    ");
}
