// Save and restore through the stores, end to end
use zcore::config::Config;
use zcore::error::SaveError;
use zcore::quetzal::{
    restore_game, save_game, save_to_form, FileSaveStore, FormChunk, MemorySaveStore,
    PortableGameState, SaveGameDataStore,
};
use zcore::test_utils::{ObjectSpec, StoryBuilder};
use zcore::vm::{Game, VM};

use test_log::test;

fn story() -> Vec<u8> {
    StoryBuilder::new(3)
        .release(88)
        .serial("840726")
        .global(0, 1)
        .object(ObjectSpec::new("room").child(2))
        .object(ObjectSpec::new("lamp").parent(1).attribute(3))
        .build()
}

fn new_vm(compress: bool) -> VM {
    let mut config = Config::default();
    config.saves.compress = compress;
    VM::new(Game::with_config(story(), config).unwrap())
}

/// Play a few "moves": change globals and objects, call two routines deep
fn play(vm: &mut VM) {
    vm.write_global(16, 500).unwrap();
    vm.write_global(40, 0xffff).unwrap();
    let tree = vm.game.object_tree();
    tree.set_attribute(&mut vm.game.memory, 2, 10).unwrap();
    tree.remove_object(&mut vm.game.memory, 2).unwrap();

    vm.push(1).unwrap();
    vm.call_routine(0xc40, None, &[], &[0, 0]).unwrap();
    vm.write_variable(2, 77).unwrap();
    vm.push(2).unwrap();
    vm.call_routine(0xc80, Some(0), &[3, 4, 5], &[0, 0, 0, 0]).unwrap();
    vm.push(3).unwrap();
    vm.push(4).unwrap();
}

fn assert_same_machine(a: &VM, b: &VM) {
    let size = a.game.dynamic_size();
    assert_eq!(
        &a.game.memory.as_slice()[..size],
        &b.game.memory.as_slice()[..size]
    );
    assert_eq!(a.stack, b.stack);
    assert_eq!(a.call_stack, b.call_stack);
}

#[test]
fn test_round_trip_compressed() {
    let mut vm = new_vm(true);
    play(&mut vm);
    let mut store = MemorySaveStore::new();
    save_game(&vm, 0xc99, &mut store).unwrap();

    let form = store.retrieve_form_chunk().unwrap();
    assert!(form.sub_chunk(b"CMem").is_some());

    let mut restored = new_vm(true);
    assert_eq!(restore_game(&mut restored, &mut store).unwrap(), 0xc99);
    assert_eq!(restored.pc, 0xc99);
    assert_same_machine(&vm, &restored);

    // the restored machine carries on where the saved one was
    assert_eq!(restored.pop().unwrap(), 4);
    assert_eq!(restored.read_variable(3).unwrap(), 5);
    restored.return_from_routine(9).unwrap();
    // result went to the stack of the caller
    assert_eq!(restored.pop().unwrap(), 9);
    assert_eq!(restored.read_variable(2).unwrap(), 77);
    let tree = restored.game.object_tree();
    assert!(tree.is_attribute_set(&restored.game.memory, 2, 10).unwrap());
    assert_eq!(tree.child(&restored.game.memory, 1).unwrap(), 0);
}

#[test]
fn test_round_trip_uncompressed() {
    let mut vm = new_vm(false);
    play(&mut vm);
    let form = save_to_form(&vm, 0xc99).unwrap();
    let umem = form.sub_chunk(b"UMem").unwrap();
    assert_eq!(umem.data.len(), vm.game.dynamic_size());
    assert!(form.sub_chunk(b"CMem").is_none());

    let bytes = form.to_bytes();
    let mut state = PortableGameState::new();
    state.read_save_game(&FormChunk::from_bytes(&bytes).unwrap()).unwrap();
    let mut restored = new_vm(false);
    state.transfer_state_to_machine(&mut restored).unwrap();
    assert_same_machine(&vm, &restored);
}

#[test]
fn test_restore_replaces_later_changes() {
    let mut vm = new_vm(true);
    let mut store = MemorySaveStore::new();
    save_game(&vm, vm.pc, &mut store).unwrap();
    play(&mut vm);
    assert_eq!(vm.read_global(16).unwrap(), 500);

    restore_game(&mut vm, &mut store).unwrap();
    assert_eq!(vm.read_global(16).unwrap(), 1);
    assert_eq!(vm.call_stack.len(), 1);
    assert!(vm.stack.is_empty());
}

#[test]
fn test_stks_layout_of_saved_frames() {
    let mut vm = new_vm(true);
    play(&mut vm);
    let form = save_to_form(&vm, 0xc99).unwrap();
    let stks = &form.sub_chunk(b"Stks").unwrap().data;

    // main frame: pc 0, discard, no locals, 1 stack value
    assert_eq!(&stks[..10], &[0, 0, 0, 0x10, 0, 0, 0, 1, 0, 1]);
    // second frame: 2 locals, discard, no arguments, 1 stack value
    assert_eq!(&stks[10..18], &[0x00, 0x0c, 0x00, 0x12, 0, 0, 0, 1]);
    // third frame: 4 locals, stores to the stack, 3 arguments
    let third = 10 + 8 + 4 + 2;
    assert_eq!(&stks[third + 3..third + 8], &[0x04, 0x00, 0b111, 0, 2]);
}

#[test]
fn test_save_for_another_story_is_refused() {
    let mut vm = new_vm(true);
    play(&mut vm);
    let mut store = MemorySaveStore::new();
    save_game(&vm, 0xc99, &mut store).unwrap();

    let other = StoryBuilder::new(3).release(88).serial("840727").build();
    let mut other = VM::new(Game::from_memory(other).unwrap());
    match restore_game(&mut other, &mut store) {
        Err(SaveError::StoryMismatch {
            saved_serial,
            serial,
            ..
        }) => {
            assert_eq!(saved_serial, "840726");
            assert_eq!(serial, "840727");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(other.call_stack.len(), 1);
    assert_eq!(other.read_global(16).unwrap(), 0);
}

#[test]
fn test_restore_without_save() {
    let mut vm = new_vm(true);
    let mut store = MemorySaveStore::new();
    assert!(matches!(
        restore_game(&mut vm, &mut store),
        Err(SaveError::NoSaveData)
    ));
}

#[test]
fn test_corrupt_save_file() {
    let mut vm = new_vm(true);
    play(&mut vm);
    let path = std::env::temp_dir().join(format!("zcore-corrupt-{}.qzl", std::process::id()));
    let mut store = FileSaveStore::new(&path);
    save_game(&vm, 0xc99, &mut store).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&path, &bytes).unwrap();

    let mut fresh = new_vm(true);
    assert!(matches!(
        restore_game(&mut fresh, &mut store),
        Err(SaveError::Truncated { .. })
    ));
    assert_eq!(fresh.call_stack.len(), 1);
    std::fs::remove_file(&path).unwrap();
}
