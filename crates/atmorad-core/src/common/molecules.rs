//! Molecule name / id tables and the global isotope ordering used to pick
//! isotopes by depth.
//!
//! Ids follow the HITRAN molecule numbering. Inert gases get ids from 901
//! upwards and carry no lines, only a molar mass.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoleculeEntry {
    pub name: &'static str,
    pub molecule_id: u32,
    pub global_isotopes: &'static [u32],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertGas {
    pub molecule_id: u32,
    pub molar_mass: f64,
}

pub const INERT_GASES: &[InertGas] = &[InertGas {
    molecule_id: 901,
    molar_mass: 39.948,
}];

pub const MOLECULES: &[MoleculeEntry] = &[
    entry("h2o", 1, &[1, 2, 3, 4, 5, 6, 129]),
    entry("co2", 2, &[7, 8, 9, 10, 11, 12, 13, 14, 121, 15, 120, 122]),
    entry("o3", 3, &[16, 17, 18, 19, 20]),
    entry("n2o", 4, &[21, 22, 23, 24, 25]),
    entry("co", 5, &[26, 27, 28, 29, 30, 31]),
    entry("ch4", 6, &[32, 33, 34, 35]),
    entry("o2", 7, &[36, 37, 38]),
    entry("no", 8, &[39, 40, 41]),
    entry("so2", 9, &[42, 43]),
    entry("no2", 10, &[44]),
    entry("nh3", 11, &[45, 46]),
    entry("hno3", 12, &[47, 117]),
    entry("oh", 13, &[48, 49, 50]),
    entry("hf", 14, &[51, 110]),
    entry("hcl", 15, &[52, 53, 107, 108]),
    entry("hbr", 16, &[54, 55, 111, 112]),
    entry("hi", 17, &[56, 113]),
    entry("clo", 18, &[57, 58]),
    entry("ocs", 19, &[59, 60, 61, 62, 63]),
    entry("h2co", 20, &[64, 65, 66]),
    entry("hocl", 21, &[67, 68]),
    entry("n2", 22, &[69, 118]),
    entry("hcn", 23, &[70, 71, 72]),
    entry("ch3cl", 24, &[73, 74]),
    entry("h2o2", 25, &[75]),
    entry("c2h2", 26, &[76, 77, 105]),
    entry("c2h6", 27, &[78, 106]),
    entry("ph3", 28, &[79]),
    entry("cof2", 29, &[80, 119]),
    entry("sf6", 30, &[126]),
    entry("h2s", 31, &[81, 82, 83]),
    entry("hcooh", 32, &[84]),
    entry("ho2", 33, &[85]),
    entry("o", 34, &[86]),
    entry("clono2", 35, &[127, 128]),
    entry("no+", 36, &[87]),
    entry("hobr", 37, &[88, 89]),
    entry("c2h4", 38, &[90, 91]),
    entry("ch3oh", 39, &[92]),
    entry("ch3br", 40, &[93, 94]),
    entry("ch3cn", 41, &[95]),
    entry("cf4", 42, &[96]),
    entry("c4h2", 43, &[116]),
    entry("hc3n", 44, &[109]),
    entry("h2", 45, &[103, 115]),
    entry("cs", 46, &[97, 98, 99, 100]),
    entry("so3", 47, &[114]),
    entry("c2n2", 48, &[123]),
    entry("cocl2", 49, &[124, 125]),
    entry("ar", 901, &[901]),
];

const fn entry(
    name: &'static str,
    molecule_id: u32,
    global_isotopes: &'static [u32],
) -> MoleculeEntry {
    MoleculeEntry {
        name,
        molecule_id,
        global_isotopes,
    }
}

pub fn molecule_by_name(name: &str) -> Option<&'static MoleculeEntry> {
    let normalized = name.trim().to_ascii_lowercase();
    MOLECULES.iter().find(|molecule| molecule.name == normalized)
}

pub fn molecule_by_id(molecule_id: u32) -> Option<&'static MoleculeEntry> {
    MOLECULES
        .iter()
        .find(|molecule| molecule.molecule_id == molecule_id)
}

pub fn molecule_id_for_name(name: &str) -> Option<u32> {
    molecule_by_name(name).map(|molecule| molecule.molecule_id)
}

pub fn inert_gas(molecule_id: u32) -> Option<&'static InertGas> {
    INERT_GASES
        .iter()
        .find(|gas| gas.molecule_id == molecule_id)
}

pub fn is_inert(molecule_id: u32) -> bool {
    inert_gas(molecule_id).is_some()
}

/// First `depth` global isotope ids of `name`, most abundant first.
/// A depth of zero or beyond the table selects every isotope.
pub fn isotopes_for_depth(name: &str, depth: usize) -> Option<&'static [u32]> {
    let molecule = molecule_by_name(name)?;
    let available = molecule.global_isotopes.len();
    let take = if depth == 0 {
        available
    } else {
        depth.min(available)
    };
    Some(&molecule.global_isotopes[..take])
}
