//! Column contract between the soakDB `mainTable` and the six aggregate
//! tables of the central store.
//!
//! Each aggregate lists `(source column, destination field)` pairs. Values are
//! always extracted by source column name, so a reordered or widened source
//! table is harmless; a missing column is reported before any row is read.

use serde::Serialize;

pub const CRYSTAL_NAME_COLUMN: &str = "CrystalName";
pub const CRYSTAL_NAME_FIELD: &str = "crystal_name";
pub const CRYSTAL_ID_FIELD: &str = "crystal_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Lab,
    Crystal,
    DataCollection,
    DataProcessing,
    Dimple,
    Refinement,
}

impl Aggregate {
    pub const ALL: [Aggregate; 6] = [
        Aggregate::Lab,
        Aggregate::Crystal,
        Aggregate::DataCollection,
        Aggregate::DataProcessing,
        Aggregate::Dimple,
        Aggregate::Refinement,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Aggregate::Lab => "lab",
            Aggregate::Crystal => "crystal",
            Aggregate::DataCollection => "data_collection",
            Aggregate::DataProcessing => "data_processing",
            Aggregate::Dimple => "dimple",
            Aggregate::Refinement => "refinement",
        }
    }

    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Aggregate::Lab => LAB_COLUMNS,
            Aggregate::Crystal => CRYSTAL_COLUMNS,
            Aggregate::DataCollection => DATA_COLLECTION_COLUMNS,
            Aggregate::DataProcessing => DATA_PROCESSING_COLUMNS,
            Aggregate::Dimple => DIMPLE_COLUMNS,
            Aggregate::Refinement => REFINEMENT_COLUMNS,
        }
    }

    /// Destination fields in table order. Every aggregate ends with
    /// `crystal_name` (raw source name) and `crystal_id` (disambiguated name);
    /// the lab aggregate already carries `crystal_name` among its own fields.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> =
            self.columns().iter().map(|(_, field)| *field).collect();
        if !fields.contains(&CRYSTAL_NAME_FIELD) {
            fields.push(CRYSTAL_NAME_FIELD);
        }
        fields.push(CRYSTAL_ID_FIELD);
        fields
    }
}

/// Every column the source query selects, in query order.
pub fn expected_source_columns() -> Vec<&'static str> {
    let mut columns = Vec::with_capacity(122);
    columns.extend(LAB_COLUMNS.iter().map(|(column, _)| *column));
    columns.push("ProjectDirectory");
    columns.extend(CRYSTAL_COLUMNS.iter().map(|(column, _)| *column));
    columns.extend(DATA_COLLECTION_COLUMNS.iter().map(|(column, _)| *column));
    columns.extend(DATA_PROCESSING_COLUMNS.iter().map(|(column, _)| *column));
    columns.extend(DIMPLE_COLUMNS.iter().map(|(column, _)| *column));
    columns.push("PANDDAStatus");
    columns.push("DatePANDDAModelCreated");
    columns.extend(REFINEMENT_COLUMNS.iter().map(|(column, _)| *column));
    columns
}

const LAB_COLUMNS: &[(&str, &str)] = &[
    ("LabVisit", "visit"),
    ("LibraryPlate", "library_plate"),
    ("LibraryName", "library_name"),
    ("CompoundSMILES", "smiles"),
    ("CompoundCode", "compound_code"),
    ("ProteinName", "protein"),
    ("CompoundStockConcentration", "stock_conc"),
    ("CompoundConcentration", "expr_conc"),
    ("SolventFraction", "solv_frac"),
    ("SoakTransferVol", "soak_vol"),
    ("SoakStatus", "soak_status"),
    ("CryoStockFraction", "cryo_stock_frac"),
    ("CryoFraction", "cryo_frac"),
    ("CryoTransferVolume", "cryo_transfer_vol"),
    ("CryoStatus", "cryo_status"),
    ("SoakingTime", "soak_time"),
    ("HarvestStatus", "harvest_status"),
    (CRYSTAL_NAME_COLUMN, CRYSTAL_NAME_FIELD),
    ("MountingResult", "mounting_result"),
    ("MountingTime", "mounting_time"),
    ("DataCollectionVisit", "data_collection_visit"),
];

const CRYSTAL_COLUMNS: &[(&str, &str)] = &[
    ("CrystalTag", "tag"),
    ("CrystalFormName", "name"),
    ("CrystalFormSpaceGroup", "spacegroup"),
    ("CrystalFormPointGroup", "point_group"),
    ("CrystalFormA", "a"),
    ("CrystalFormB", "b"),
    ("CrystalFormC", "c"),
    ("CrystalFormAlpha", "alpha"),
    ("CrystalFormBeta", "beta"),
    ("CrystalFormGamma", "gamma"),
    ("CrystalFormVolume", "volume"),
];

const DATA_COLLECTION_COLUMNS: &[(&str, &str)] = &[
    ("DataCollectionDate", "date"),
    ("DataCollectionOutcome", "outcome"),
    ("DataCollectionWavelength", "wavelength"),
];

const DATA_PROCESSING_COLUMNS: &[(&str, &str)] = &[
    ("DataProcessingPathToImageFiles", "image_path"),
    ("DataProcessingProgram", "program"),
    ("DataProcessingSpaceGroup", "spacegroup"),
    ("DataProcessingUnitCell", "unit_cell"),
    ("DataProcessingAutoAssigned", "auto_assigned"),
    ("DataProcessingResolutionOverall", "res_overall"),
    ("DataProcessingResolutionLow", "res_low"),
    ("DataProcessingResolutionLowInnerShell", "res_low_inner_shell"),
    ("DataProcessingResolutionHigh", "res_high"),
    ("DataProcessingResolutionHigh15Sigma", "res_high_15_sigma"),
    ("DataProcessingResolutionHighOuterShell", "res_high_outer_shell"),
    ("DataProcessingRMergeOverall", "r_merge_overall"),
    ("DataProcessingRMergeLow", "r_merge_low"),
    ("DataProcessingRMergeHigh", "r_merge_high"),
    ("DataProcessingIsigOverall", "isig_overall"),
    ("DataProcessingIsigLow", "isig_low"),
    ("DataProcessingIsigHigh", "isig_high"),
    ("DataProcessingCompletenessOverall", "completeness_overall"),
    ("DataProcessingCompletenessLow", "completeness_low"),
    ("DataProcessingCompletenessHigh", "completeness_high"),
    ("DataProcessingMultiplicityOverall", "multiplicity_overall"),
    ("DataProcessingMultiplicityLow", "multiplicity_low"),
    ("DataProcessingMultiplicityHigh", "multiplicity_high"),
    ("DataProcessingCChalfOverall", "cchalf_overall"),
    ("DataProcessingCChalfLow", "cchalf_low"),
    ("DataProcessingCChalfHigh", "cchalf_high"),
    ("DataProcessingPathToLogFile", "logfile_path"),
    ("DataProcessingPathToMTZfile", "mtz_path"),
    ("DataProcessingLOGfileName", "log_name"),
    ("DataProcessingMTZfileName", "mtz_name"),
    ("DataProcessingDirectoryOriginal", "original_directory"),
    ("DataProcessingUniqueReflectionsOverall", "unique_ref_overall"),
    ("DataProcessingLattice", "lattice"),
    ("DataProcessingPointGroup", "point_group"),
    ("DataProcessingUnitCellVolume", "unit_cell_vol"),
    ("DataProcessingAlert", "alert"),
    ("DataProcessingScore", "score"),
    ("DataProcessingStatus", "status"),
    ("DataProcessingRcryst", "r_cryst"),
    ("DataProcessingRfree", "r_free"),
    ("DataProcessingPathToDimplePDBfile", "dimple_pdb_path"),
    ("DataProcessingPathToDimpleMTZfile", "dimple_mtz_path"),
    ("DataProcessingDimpleSuccessful", "dimple_status"),
];

const DIMPLE_COLUMNS: &[(&str, &str)] = &[
    ("DimpleResolutionHigh", "res_high"),
    ("DimpleRfree", "r_free"),
    ("DimplePathToPDB", "pdb_path"),
    ("DimplePathToMTZ", "mtz_path"),
    ("DimpleReferencePDB", "reference_pdb"),
    ("DimpleStatus", "status"),
    ("DimplePANDDAwasRun", "pandda_run"),
    ("DimplePANDDAhit", "pandda_hit"),
    ("DimplePANDDAreject", "pandda_reject"),
    ("DimplePANDDApath", "pandda_path"),
];

const REFINEMENT_COLUMNS: &[(&str, &str)] = &[
    ("RefinementResolution", "res"),
    ("RefinementResolutionTL", "res_tl"),
    ("RefinementRcryst", "rcryst"),
    ("RefinementRcrystTraficLight", "rcryst_tl"),
    ("RefinementRfree", "r_free"),
    ("RefinementRfreeTraficLight", "rfree_tl"),
    ("RefinementSpaceGroup", "spacegroup"),
    ("RefinementLigandCC", "lig_cc"),
    ("RefinementRmsdBonds", "rmsd_bonds"),
    ("RefinementRmsdBondsTL", "rmsd_bonds_tl"),
    ("RefinementRmsdAngles", "rmsd_angles"),
    ("RefinementRmsdAnglesTL", "rmsd_angles_tl"),
    ("RefinementOutcome", "outcome"),
    ("RefinementMTZfree", "mtz_free"),
    ("RefinementCIF", "cif"),
    ("RefinementCIFStatus", "cif_status"),
    ("RefinementCIFprogram", "cif_prog"),
    ("RefinementPDB_latest", "pdb_latest"),
    ("RefinementMTZ_latest", "mtz_latest"),
    ("RefinementMatrixWeight", "matrix_weight"),
    ("RefinementPathToRefinementFolder", "refinement_path"),
    ("RefinementLigandConfidence", "lig_confidence"),
    ("RefinementLigandBoundConformation", "lig_bound_conf"),
    ("RefinementBoundConformation", "bound_conf"),
    ("RefinementMolProbityScore", "molprobity_score"),
    ("RefinementMolProbityScoreTL", "molprobity_score_tl"),
    ("RefinementRamachandranOutliers", "ramachandran_outliers"),
    ("RefinementRamachandranOutliersTL", "ramachandran_outliers_tl"),
    ("RefinementRamachandranFavored", "ramachandran_favoured"),
    ("RefinementRamachandranFavoredTL", "ramachandran_favoured_tl"),
    ("RefinementStatus", "status"),
];
