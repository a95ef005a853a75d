// 📐 Schema Registry - Dataset shapes
// Static mapping from dataset name to raw column order, canonical columns,
// date columns and numeric columns.
//
// Input files carry no trustworthy header: the raw column names below are
// assigned positionally, so the raw column count is the only shape check.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column that identifies the patient in every dataset.
pub const NAME_COLUMN: &str = "nome";

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    LaudosApac,
    SessoesHd,
    EstatisticaMensal,
    EventosCateter,
    FaturamentoGeral,
    FaturamentoConvenio,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::LaudosApac,
        Dataset::SessoesHd,
        Dataset::EstatisticaMensal,
        Dataset::EventosCateter,
        Dataset::FaturamentoGeral,
        Dataset::FaturamentoConvenio,
    ];

    /// Table name in the store (also the registry key)
    pub fn table_name(&self) -> &'static str {
        match self {
            Dataset::LaudosApac => "laudos_apac",
            Dataset::SessoesHd => "sessoes_hd",
            Dataset::EstatisticaMensal => "estatistica_mensal",
            Dataset::EventosCateter => "eventos_cateter",
            Dataset::FaturamentoGeral => "faturamento_geral",
            Dataset::FaturamentoConvenio => "faturamento_convenio",
        }
    }

    /// Human-readable title for status surfaces
    pub fn title(&self) -> &'static str {
        match self {
            Dataset::LaudosApac => "Laudos de APAC",
            Dataset::SessoesHd => "Sessões HD (p/ Remarcações)",
            Dataset::EstatisticaMensal => "Estatística Mensal",
            Dataset::EventosCateter => "Eventos de Cateter e FAV",
            Dataset::FaturamentoGeral => "Faturamento Geral (SUS)",
            Dataset::FaturamentoConvenio => "Faturamento Geral (Convênio)",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SchemaError> {
        let wanted = name.trim();
        Dataset::ALL
            .into_iter()
            .find(|d| d.table_name() == wanted)
            .ok_or_else(|| SchemaError::UnknownDataset(name.to_string()))
    }

    pub fn schema(&self) -> &'static DatasetSchema {
        match self {
            Dataset::LaudosApac => &LAUDOS_APAC,
            Dataset::SessoesHd => &SESSOES_HD,
            Dataset::EstatisticaMensal => &ESTATISTICA_MENSAL,
            Dataset::EventosCateter => &EVENTOS_CATETER,
            Dataset::FaturamentoGeral => &FATURAMENTO_GERAL,
            Dataset::FaturamentoConvenio => &FATURAMENTO_CONVENIO,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

// ============================================================================
// COLUMN KINDS
// ============================================================================

/// How a canonical column is coerced at ingestion and typed in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Trimmed text, empty when missing
    Text,
    /// `dd/mm/yyyy HH:MM:SS`, null on parse failure
    Date,
    /// Comma-decimal number, zero on parse failure
    Number,
    /// Number truncated to an integer (session counts)
    Integer,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text | ColumnKind::Date => "TEXT",
            ColumnKind::Number => "REAL",
            ColumnKind::Integer => "INTEGER",
        }
    }
}

// ============================================================================
// DATASET SCHEMA
// ============================================================================

#[derive(Debug)]
pub struct DatasetSchema {
    pub dataset: Dataset,
    /// Positional names of the columns as they appear in the input file
    pub raw_columns: &'static [&'static str],
    /// Columns kept in the store, in store order
    pub canonical_columns: &'static [&'static str],
    pub date_columns: &'static [&'static str],
    pub numeric_columns: &'static [&'static str],
    /// Subset of `numeric_columns` truncated to integers after coercion
    pub integer_columns: &'static [&'static str],
}

impl DatasetSchema {
    pub fn raw_column_count(&self) -> usize {
        self.raw_columns.len()
    }

    pub fn raw_index(&self, column: &str) -> Option<usize> {
        self.raw_columns.iter().position(|c| *c == column)
    }

    pub fn canonical_index(&self, column: &str) -> Option<usize> {
        self.canonical_columns.iter().position(|c| *c == column)
    }

    pub fn column_kind(&self, column: &str) -> ColumnKind {
        if self.integer_columns.contains(&column) {
            ColumnKind::Integer
        } else if self.numeric_columns.contains(&column) {
            ColumnKind::Number
        } else if self.date_columns.contains(&column) {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    }
}

/// Look up the schema registered under `dataset`
pub fn get_schema(dataset: &str) -> Result<&'static DatasetSchema, SchemaError> {
    Dataset::from_name(dataset).map(|d| d.schema())
}

// ============================================================================
// REGISTRY
// ============================================================================

const FATURAMENTO_GERAL_COLUMNS: &[&str] = &[
    "posicao", "convenio", "data", "cod_prontuario", "nome", "matricula",
    "numero_guia", "senha_autoriz", "lote", "data_envio", "protocolo", "titulo",
    "data_inc_titulo", "executante", "tipo_atendimento", "servico_material",
    "codigo", "grupo", "quant", "total", "tipo_guia", "programa_tratamento", "tipo_cobranca",
];

const FATURAMENTO_CONVENIO_COLUMNS: &[&str] = &[
    "posicao", "convenio", "data", "cod_prontuario", "nome", "matricula",
    "numero_guia", "senha_autoriz", "lote", "data_envio", "protocolo", "titulo",
    "data_inc_titulo", "executante", "tipo", "servico_material", "codigo",
    "grupo", "quant", "total", "tipo_guia", "programa_tratamento", "tipo_apresentacao", "plano",
];

const BILLING_DATE_COLUMNS: &[&str] = &["data", "data_envio", "data_inc_titulo"];
const BILLING_NUMERIC_COLUMNS: &[&str] = &["quant", "total"];

static LAUDOS_APAC: DatasetSchema = DatasetSchema {
    dataset: Dataset::LaudosApac,
    raw_columns: &[
        "nome", "inicio_prog", "codigo_procedimento", "tratamento_procedimento", "situacao",
        "data_saida", "n_apac", "inicio", "final", "solicitante", "turno", "cns", "cpf",
        "telefone", "cidade", "servico",
    ],
    canonical_columns: &["nome", "tratamento_procedimento", "situacao", "data_saida", "n_apac", "final"],
    date_columns: &["data_saida", "final"],
    numeric_columns: &[],
    integer_columns: &[],
};

static SESSOES_HD: DatasetSchema = DatasetSchema {
    dataset: Dataset::SessoesHd,
    raw_columns: &[
        "nome", "convenio", "hd_normais", "hd_extras", "hd_remarcadas", "falta", "nao_cobra",
        "total_exceto_faltas",
    ],
    canonical_columns: &["nome", "hd_normais", "hd_extras", "hd_remarcadas"],
    date_columns: &[],
    numeric_columns: &["hd_normais", "hd_extras", "hd_remarcadas"],
    integer_columns: &["hd_normais", "hd_extras", "hd_remarcadas"],
};

static ESTATISTICA_MENSAL: DatasetSchema = DatasetSchema {
    dataset: Dataset::EstatisticaMensal,
    raw_columns: &[
        "num", "nome", "dt_nasc", "sexo", "cpf", "cns", "dt_entr", "diag", "cr", "u_pre",
        "u_pos", "n_s", "hep_c", "hbsag", "hiv", "t_centro", "t_proced", "txr", "alta_amb",
        "abandono", "obito",
    ],
    canonical_columns: &["nome", "dt_entr", "hep_c", "hbsag", "hiv", "alta_amb", "obito"],
    date_columns: &["dt_entr"],
    numeric_columns: &[],
    integer_columns: &[],
};

static EVENTOS_CATETER: DatasetSchema = DatasetSchema {
    dataset: Dataset::EventosCateter,
    raw_columns: &[
        "data", "acesso", "nome", "evento", "tipo", "localizacao", "convenio", "nao_cobra",
        "data_cobranca", "medico", "observacoes", "programa_na_data", "programa_ref",
        "programa_atual",
    ],
    canonical_columns: &["data", "acesso", "nome", "evento", "tipo", "localizacao", "convenio", "nao_cobra"],
    date_columns: &["data"],
    numeric_columns: &[],
    integer_columns: &[],
};

static FATURAMENTO_GERAL: DatasetSchema = DatasetSchema {
    dataset: Dataset::FaturamentoGeral,
    raw_columns: FATURAMENTO_GERAL_COLUMNS,
    canonical_columns: FATURAMENTO_GERAL_COLUMNS,
    date_columns: BILLING_DATE_COLUMNS,
    numeric_columns: BILLING_NUMERIC_COLUMNS,
    integer_columns: &[],
};

static FATURAMENTO_CONVENIO: DatasetSchema = DatasetSchema {
    dataset: Dataset::FaturamentoConvenio,
    raw_columns: FATURAMENTO_CONVENIO_COLUMNS,
    canonical_columns: FATURAMENTO_CONVENIO_COLUMNS,
    date_columns: BILLING_DATE_COLUMNS,
    numeric_columns: BILLING_NUMERIC_COLUMNS,
    integer_columns: &[],
};

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_schema_known_dataset() {
        let schema = get_schema("sessoes_hd").unwrap();
        assert_eq!(schema.dataset, Dataset::SessoesHd);
        assert_eq!(schema.raw_column_count(), 8);
        assert_eq!(schema.canonical_columns, &["nome", "hd_normais", "hd_extras", "hd_remarcadas"]);
    }

    #[test]
    fn test_get_schema_unknown_dataset() {
        let err = get_schema("pacientes").unwrap_err();
        assert_eq!(err, SchemaError::UnknownDataset("pacientes".to_string()));
    }

    #[test]
    fn test_every_schema_keeps_name_and_known_columns() {
        for dataset in Dataset::ALL {
            let schema = dataset.schema();
            assert_eq!(schema.dataset, dataset);
            assert!(schema.canonical_index(NAME_COLUMN).is_some(), "{dataset} lacks nome");

            // Canonical, date and numeric columns must all come from the raw layout
            for column in schema
                .canonical_columns
                .iter()
                .chain(schema.date_columns)
                .chain(schema.numeric_columns)
            {
                assert!(schema.raw_index(column).is_some(), "{dataset}: {column} not raw");
            }
            for column in schema.integer_columns {
                assert!(schema.numeric_columns.contains(column));
            }
        }
    }

    #[test]
    fn test_raw_column_counts() {
        assert_eq!(Dataset::LaudosApac.schema().raw_column_count(), 16);
        assert_eq!(Dataset::EstatisticaMensal.schema().raw_column_count(), 21);
        assert_eq!(Dataset::EventosCateter.schema().raw_column_count(), 14);
        assert_eq!(Dataset::FaturamentoGeral.schema().raw_column_count(), 23);
        assert_eq!(Dataset::FaturamentoConvenio.schema().raw_column_count(), 24);
    }

    #[test]
    fn test_column_kinds() {
        let schema = Dataset::FaturamentoGeral.schema();
        assert_eq!(schema.column_kind("quant"), ColumnKind::Number);
        assert_eq!(schema.column_kind("data_envio"), ColumnKind::Date);
        assert_eq!(schema.column_kind("nome"), ColumnKind::Text);
        assert_eq!(Dataset::SessoesHd.schema().column_kind("hd_extras"), ColumnKind::Integer);
    }
}
