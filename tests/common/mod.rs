//! Synthetic customer tables shared by the integration tests

#![allow(dead_code)]

use kolosal_churn::dataset::Record;
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs::File;
use std::path::Path;

pub struct Customers {
    pub ids: Vec<String>,
    pub edad: Vec<f64>,
    pub sexo: Vec<String>,
    pub estado_civil: Vec<String>,
    pub nacionalidad: Vec<String>,
    pub nivel_educativo: Vec<String>,
    pub ingresos_mensuales: Vec<f64>,
    pub ocupacion: Vec<String>,
    pub nivel_riesgo_crediticio: Vec<String>,
    pub tarjeta_credito: Vec<i64>,
    pub churned: Vec<i64>,
}

fn pick<'a>(rng: &mut Xoshiro256PlusPlus, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

/// Customers whose churn depends on income, credit risk, age and card ownership
pub fn customers(n: usize, seed: u64) -> Customers {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut c = Customers {
        ids: Vec::with_capacity(n),
        edad: Vec::with_capacity(n),
        sexo: Vec::with_capacity(n),
        estado_civil: Vec::with_capacity(n),
        nacionalidad: Vec::with_capacity(n),
        nivel_educativo: Vec::with_capacity(n),
        ingresos_mensuales: Vec::with_capacity(n),
        ocupacion: Vec::with_capacity(n),
        nivel_riesgo_crediticio: Vec::with_capacity(n),
        tarjeta_credito: Vec::with_capacity(n),
        churned: Vec::with_capacity(n),
    };

    for i in 0..n {
        let edad = rng.gen_range(18..70) as f64;
        let ingresos = rng.gen_range(800..6000) as f64;
        let riesgo = pick(&mut rng, &["Bajo", "Medio", "Alto"]);
        let tarjeta = rng.gen_range(0..2);

        let mut score = 0.0;
        if ingresos < 2000.0 {
            score += 1.5;
        }
        if riesgo == "Alto" {
            score += 1.0;
        }
        if edad < 30.0 {
            score += 0.5;
        }
        score -= 0.5 * tarjeta as f64;
        score += rng.gen_range(-0.5..0.5);

        c.ids.push(format!("CL{:05}", i));
        c.edad.push(edad);
        c.sexo.push(pick(&mut rng, &["M", "F"]).to_string());
        c.estado_civil.push(pick(&mut rng, &["Soltero", "Casado", "Divorciado"]).to_string());
        c.nacionalidad.push(pick(&mut rng, &["Peruana", "Extranjera"]).to_string());
        c.nivel_educativo.push(pick(&mut rng, &["Secundaria", "Tecnico", "Universitario"]).to_string());
        c.ingresos_mensuales.push(ingresos);
        c.ocupacion.push(pick(&mut rng, &["Empleado", "Independiente", "Estudiante", "Jubilado"]).to_string());
        c.nivel_riesgo_crediticio.push(riesgo.to_string());
        c.tarjeta_credito.push(tarjeta);
        c.churned.push(i64::from(score > 1.2));
    }
    c
}

impl Customers {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("ClienteID".into(), &self.ids),
            Column::new("edad".into(), &self.edad),
            Column::new("sexo".into(), &self.sexo),
            Column::new("estado_civil".into(), &self.estado_civil),
            Column::new("nacionalidad".into(), &self.nacionalidad),
            Column::new("nivel_educativo".into(), &self.nivel_educativo),
            Column::new("ingresos_mensuales".into(), &self.ingresos_mensuales),
            Column::new("ocupacion".into(), &self.ocupacion),
            Column::new("nivel_riesgo_crediticio".into(), &self.nivel_riesgo_crediticio),
            Column::new("tarjeta_credito".into(), &self.tarjeta_credito),
        ]
    }

    /// Table labelled with `fuga`
    pub fn frame(&self) -> DataFrame {
        self.frame_with_label("fuga")
    }

    /// Table labelled with the given indicator; `cliente_activo` stores the negation
    pub fn frame_with_label(&self, indicator: &str) -> DataFrame {
        let label: Vec<i64> = if indicator == "cliente_activo" {
            self.churned.iter().map(|v| 1 - v).collect()
        } else {
            self.churned.clone()
        };
        let mut columns = self.columns();
        columns.push(Column::new(indicator.into(), label));
        DataFrame::new(columns).unwrap()
    }

    pub fn frame_without(&self, column: &str) -> DataFrame {
        self.frame().drop(column).unwrap()
    }

    pub fn write_csv(&self, path: &Path) {
        self.write_delimited(path, b',');
    }

    pub fn write_delimited(&self, path: &Path, separator: u8) {
        let mut df = self.frame();
        let mut file = File::create(path).unwrap();
        CsvWriter::new(&mut file).with_separator(separator).finish(&mut df).unwrap();
    }

    /// Inference record for row `i`, including the customer id
    pub fn record(&self, i: usize) -> Record {
        Record::new()
            .with("ClienteID", self.ids[i].as_str())
            .with("edad", self.edad[i])
            .with("sexo", self.sexo[i].as_str())
            .with("estado_civil", self.estado_civil[i].as_str())
            .with("nacionalidad", self.nacionalidad[i].as_str())
            .with("nivel_educativo", self.nivel_educativo[i].as_str())
            .with("ingresos_mensuales", self.ingresos_mensuales[i])
            .with("ocupacion", self.ocupacion[i].as_str())
            .with("nivel_riesgo_crediticio", self.nivel_riesgo_crediticio[i].as_str())
            .with("tarjeta_credito", self.tarjeta_credito[i])
    }

    pub fn churn_count(&self) -> usize {
        self.churned.iter().filter(|&&v| v == 1).count()
    }
}
