//! Column names of the standard driver metadata result sets.

pub const TABLE_NAME: &str = "TABLE_NAME";
pub const TABLE_TYPE: &str = "TABLE_TYPE";
pub const REMARKS: &str = "REMARKS";

pub const COLUMN_NAME: &str = "COLUMN_NAME";
pub const DATA_TYPE: &str = "DATA_TYPE";
pub const TYPE_NAME: &str = "TYPE_NAME";
pub const COLUMN_SIZE: &str = "COLUMN_SIZE";
pub const DECIMAL_DIGITS: &str = "DECIMAL_DIGITS";
pub const NULLABLE: &str = "NULLABLE";
pub const COLUMN_DEF: &str = "COLUMN_DEF";
pub const ORDINAL_POSITION: &str = "ORDINAL_POSITION";
pub const IS_AUTOINCREMENT: &str = "IS_AUTOINCREMENT";

pub const INDEX_NAME: &str = "INDEX_NAME";
pub const INDEX_QUALIFIER: &str = "INDEX_QUALIFIER";
pub const NON_UNIQUE: &str = "NON_UNIQUE";
pub const INDEX_TYPE: &str = "TYPE";
pub const ASC_OR_DESC: &str = "ASC_OR_DESC";

pub const PK_NAME: &str = "PK_NAME";
pub const KEY_SEQ: &str = "KEY_SEQ";

pub const FK_NAME: &str = "FK_NAME";
pub const FKTABLE_NAME: &str = "FKTABLE_NAME";
pub const FKCOLUMN_NAME: &str = "FKCOLUMN_NAME";
pub const PKTABLE_NAME: &str = "PKTABLE_NAME";
pub const PKCOLUMN_NAME: &str = "PKCOLUMN_NAME";
pub const UPDATE_RULE: &str = "UPDATE_RULE";
pub const DELETE_RULE: &str = "DELETE_RULE";
pub const DEFERRABILITY: &str = "DEFERRABILITY";

pub const PROCEDURE_NAME: &str = "PROCEDURE_NAME";
pub const PROCEDURE_CAT: &str = "PROCEDURE_CAT";
pub const PROCEDURE_TYPE: &str = "PROCEDURE_TYPE";
